use serde::{Deserialize, Serialize};

/// Severity thresholds in g. Invariant: minor < moderate < severe.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Thresholds {
    pub minor: f64,
    pub moderate: f64,
    pub severe: f64,
}

impl Thresholds {
    pub fn is_ordered(&self) -> bool {
        self.minor < self.moderate && self.moderate < self.severe
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        // Original deployment values for an MPU6050 at +/-2g range
        Thresholds {
            minor: 0.035,
            moderate: 0.10,
            severe: 0.50,
        }
    }
}

/// Engine configuration, consumed once at construction. Thresholds and
/// window sizes are not reconfigurable mid-run; restart the engine to apply
/// a new remote config.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub device_id: String,
    pub thresholds: Thresholds,
    /// Pre-event ring capacity N (pre window / sampling period).
    pub pre_samples: usize,
    /// Post-event buffer capacity M (post window / sampling period).
    pub post_samples: usize,
    pub sample_period_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // 3 s before + 3 s after the trigger at 20 Hz
        EngineConfig {
            device_id: "unknown".to_string(),
            thresholds: Thresholds::default(),
            pre_samples: 60,
            post_samples: 60,
            sample_period_ms: 50,
        }
    }
}

/// Config payload served by the collector's `/api/init` endpoint.
///
/// Firmware version/url are parsed for visibility but OTA updates are
/// handled outside this process.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteConfig {
    pub heartbeat_interval: u64,
    pub sensitivity: Thresholds,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub firmware_url: Option<String>,
}

impl RemoteConfig {
    /// Apply this remote config onto an engine config, rejecting misordered
    /// sensitivity values (the local defaults stay in that case).
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if self.sensitivity.is_ordered() {
            config.thresholds = self.sensitivity;
        } else {
            log::warn!(
                "ignoring misordered sensitivity ({:.3}/{:.3}/{:.3}), keeping {:.3}/{:.3}/{:.3}",
                self.sensitivity.minor,
                self.sensitivity.moderate,
                self.sensitivity.severe,
                config.thresholds.minor,
                config.thresholds.moderate,
                config.thresholds.severe
            );
        }
    }
}
