use serde::{Deserialize, Serialize};

use crate::capture::Episode;
use crate::sensors::Sample;
use crate::trigger::Severity;

/// One waveform point on the wire: `[relative_ms, ax, ay, az]`, time signed
/// and relative to the trigger instant (negative = pre-trigger).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveformEntry(pub i64, pub f64, pub f64, pub f64);

impl WaveformEntry {
    fn from_sample(sample: &Sample, trigger_ms: i64) -> Self {
        WaveformEntry(
            sample.timestamp_ms as i64 - trigger_ms,
            round4(sample.ax),
            round4(sample.ay),
            round4(sample.az),
        )
    }

    pub fn relative_ms(&self) -> i64 {
        self.0
    }
}

/// Simple near-real-time event notification, sent on every non-quiet
/// classification independently of waveform capture.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventNotification {
    pub id: String,
    pub level: Severity,
    #[serde(rename = "deltaG")]
    pub delta_g: f64,
}

/// Full before/after waveform report for one completed capture episode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaveformReport {
    pub id: String,
    pub level: Severity,
    #[serde(rename = "deltaG")]
    pub delta_g: f64,
    /// How stale this report is: ms elapsed between the trigger and the
    /// moment of rendering. The collector uses it to recover wall time.
    pub event_offset_ms: u64,
    pub waveform: Vec<WaveformEntry>,
}

impl WaveformReport {
    /// Worst-case encoded size for capacity planning; the encoder pre-sizes
    /// its buffer to this so a render never reallocates mid-episode.
    pub fn max_payload_bytes(&self) -> usize {
        128 + self.id.len() + 48 * self.waveform.len()
    }

    /// Encode into a pre-sized buffer.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.max_payload_bytes());
        serde_json::to_writer(&mut buf, self)?;
        Ok(buf)
    }
}

/// Merge the chronological pre-event snapshot and the post-event buffer into
/// one ordered report. Deterministic and total: pre samples first (oldest
/// to newest), then post samples in append order, which is chronological by
/// construction since both buffers preserve arrival order.
pub fn render<'a>(
    device_id: &str,
    pre: impl Iterator<Item = &'a Sample>,
    post: &[Sample],
    episode: &Episode,
    now_ms: u64,
) -> WaveformReport {
    let trigger_ms = episode.trigger_ms as i64;

    let mut waveform = Vec::with_capacity(pre.size_hint().0 + post.len());
    for sample in pre {
        waveform.push(WaveformEntry::from_sample(sample, trigger_ms));
    }
    for sample in post {
        waveform.push(WaveformEntry::from_sample(sample, trigger_ms));
    }

    WaveformReport {
        id: device_id.to_string(),
        level: episode.level,
        delta_g: round4(episode.peak_deviation),
        event_offset_ms: now_ms.saturating_sub(episode.trigger_ms),
        waveform,
    }
}

/// Four decimal digits matches the sensor's resolution at +/-2g and keeps
/// payload size predictable.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
