use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// One bias-corrected 3-axis acceleration sample in g, tagged with a
/// monotonic millisecond timestamp. Copied by value into the capture
/// buffers; no shared ownership.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

impl Sample {
    pub fn new(timestamp_ms: u64, ax: f64, ay: f64, az: f64) -> Self {
        Sample {
            timestamp_ms,
            ax,
            ay,
            az,
        }
    }
}

/// Mock accelerometer task: one sample per tick at the configured period.
///
/// The real MPU6050 driver and its bias calibration live outside this crate;
/// this generator stands in for it so the node runs end-to-end. Timestamps
/// come from a task-local monotonic clock, so they are strictly
/// non-decreasing as the engine requires.
///
/// `shock_every` injects a strong single-axis transient every N samples,
/// which is handy for exercising the capture path against a live collector.
pub async fn sample_loop(tx: Sender<Sample>, period_ms: u64, shock_every: Option<u64>) {
    let mut ticker = interval(Duration::from_millis(period_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let start = Instant::now();
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;

        let timestamp_ms = start.elapsed().as_millis() as u64;
        let sample = mock_sample(sample_count, timestamp_ms, shock_every);

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 1200 == 0 {
                    eprintln!("[accel] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[accel] Channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Engine is behind (waveform upload in flight); drop this sample
            }
        }
    }
}

fn mock_sample(seq: u64, timestamp_ms: u64, shock_every: Option<u64>) -> Sample {
    use std::f64::consts::PI;
    let t = seq as f64 * 0.05;

    // Low-amplitude ambient noise, well under the minor threshold
    let mut ax = (t * 2.0 * PI).sin() * 0.004;
    let mut ay = (t * 1.3 * PI).cos() * 0.003;
    let az = (t * 0.7 * PI).sin() * 0.005;

    if let Some(n) = shock_every {
        if n > 0 && seq > 0 && seq % n == 0 {
            // Single-axis shock, strong enough to trip the severe threshold
            ax = 0.62;
            ay = 0.11;
        }
    }

    Sample::new(timestamp_ms, ax, ay, az)
}
