use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::waveform::{EventNotification, WaveformReport};

/// Errors from the collector uplink.
#[derive(Debug, Clone)]
pub enum UplinkError {
    NetworkTimeout,
    HttpError(u16),
    ParseError(String),
    UnknownError(String),
}

impl Display for UplinkError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            UplinkError::NetworkTimeout => write!(f, "Network timeout"),
            UplinkError::HttpError(code) => write!(f, "HTTP error: {}", code),
            UplinkError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            UplinkError::UnknownError(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for UplinkError {}

/// Outcome of a heartbeat round trip. The collector answers 205 when it
/// wants the node to restart (config change, new firmware staged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Ok,
    RestartRequested,
}

/// HTTP client for the remote collector.
///
/// Deliberately fire-and-forget for event traffic: a failed send is
/// reported to the caller, logged, and the payload dropped. No retry queue
/// exists, so events during an outage are lost — a known trade-off of the
/// unattended-node design, durability traded for simplicity.
pub struct EventClient {
    client: reqwest::Client,
    root_url: String,
    event_url: String,
    device_id: String,
}

impl EventClient {
    /// `root_url` is the collector base (trailing slash optional); events
    /// go to `{root}/api/seismic` per the collector contract.
    pub fn new(root_url: &str, device_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("seismo-node/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let root_url = root_url.trim_end_matches('/').to_string();
        let event_url = format!("{}/api/seismic", root_url);

        EventClient {
            client,
            root_url,
            event_url,
            device_id: device_id.to_string(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Fetch thresholds and heartbeat interval from the collector's init
    /// endpoint. The firmware version is reported so the collector can
    /// track what each node runs.
    pub async fn fetch_config(&self, firmware_version: &str) -> Result<RemoteConfig, UplinkError> {
        let url = format!(
            "{}/api/init?id={}&version={}",
            self.root_url, self.device_id, firmware_version
        );

        let response = self.client.get(&url).send().await.map_err(wrap_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UplinkError::HttpError(status.as_u16()));
        }

        response
            .json::<RemoteConfig>()
            .await
            .map_err(|e| UplinkError::ParseError(e.to_string()))
    }

    /// Connectivity check against the collector root. Any 2xx is healthy;
    /// 205 asks the node to restart.
    pub async fn heartbeat(&self) -> Result<HeartbeatOutcome, UplinkError> {
        let url = format!("{}/?id={}", self.root_url, self.device_id);

        let response = self.client.get(&url).send().await.map_err(wrap_reqwest)?;
        let status = response.status();

        if status.as_u16() == 205 {
            Ok(HeartbeatOutcome::RestartRequested)
        } else if status.is_success() {
            Ok(HeartbeatOutcome::Ok)
        } else {
            Err(UplinkError::HttpError(status.as_u16()))
        }
    }

    /// POST a simple event notification. The collector answers 201 when the
    /// event was logged.
    pub async fn post_notification(
        &self,
        notification: &EventNotification,
    ) -> Result<(), UplinkError> {
        let response = self
            .client
            .post(&self.event_url)
            .json(notification)
            .send()
            .await
            .map_err(wrap_reqwest)?;

        expect_created(response.status())
    }

    /// POST a full waveform report. The body is pre-encoded by the
    /// serializer so its size is bounded before the request starts.
    pub async fn post_waveform(&self, report: &WaveformReport) -> Result<(), UplinkError> {
        let body = report
            .to_json_bytes()
            .map_err(|e| UplinkError::ParseError(e.to_string()))?;

        log::info!(
            "uploading waveform: {} peak={:.4}g {} entries {} bytes",
            report.level,
            report.delta_g,
            report.waveform.len(),
            body.len()
        );

        let response = self
            .client
            .post(&self.event_url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(wrap_reqwest)?;

        expect_created(response.status())
    }
}

fn expect_created(status: reqwest::StatusCode) -> Result<(), UplinkError> {
    if status.as_u16() == 201 {
        Ok(())
    } else {
        Err(UplinkError::HttpError(status.as_u16()))
    }
}

fn wrap_reqwest(e: reqwest::Error) -> UplinkError {
    if e.is_timeout() {
        UplinkError::NetworkTimeout
    } else {
        UplinkError::UnknownError(e.to_string())
    }
}
