use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration, Instant};

use seismo_node::capture::CaptureEngine;
use seismo_node::config::EngineConfig;
use seismo_node::sensors::{self, Sample};
use seismo_node::uplink::{EventClient, HeartbeatOutcome};

#[derive(Parser, Debug)]
#[command(name = "seismo_node")]
#[command(about = "Vibration monitor node - threshold triggers with waveform capture", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Collector base URL
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Device identifier reported to the collector
    #[arg(long, default_value = "unknown")]
    device_id: String,

    /// Sampling period in milliseconds
    #[arg(long, default_value = "50")]
    period_ms: u64,

    /// Pre-event window length in samples
    #[arg(long, default_value = "60")]
    pre_samples: usize,

    /// Post-event window length in samples
    #[arg(long, default_value = "60")]
    post_samples: usize,

    /// Inject a synthetic shock every N samples (mock source only)
    #[arg(long)]
    shock_every: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Seismo Node Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Collector: {}", args.server);
    println!("  Device ID: {}", args.device_id);
    println!("  Sampling: {} ms period, {} pre / {} post samples",
        args.period_ms, args.pre_samples, args.post_samples);

    let client = Arc::new(EventClient::new(&args.server, &args.device_id));

    let mut config = EngineConfig {
        device_id: args.device_id.clone(),
        pre_samples: args.pre_samples,
        post_samples: args.post_samples,
        sample_period_ms: args.period_ms,
        ..EngineConfig::default()
    };
    let mut heartbeat_interval_ms: u64 = 60_000;

    // Pull thresholds and heartbeat interval from the collector; local
    // defaults apply when it is unreachable (the original firmware rebooted
    // here, but a host process can keep monitoring offline).
    match client.fetch_config(env!("CARGO_PKG_VERSION")).await {
        Ok(remote) => {
            remote.apply_to(&mut config);
            heartbeat_interval_ms = remote.heartbeat_interval;
            println!(
                "[{}] Remote config: heartbeat={}ms thresholds={:.3}/{:.3}/{:.3}",
                ts_now(),
                heartbeat_interval_ms,
                config.thresholds.minor,
                config.thresholds.moderate,
                config.thresholds.severe
            );
            if let Some(version) = remote.firmware_version.as_deref() {
                // OTA updates are handled by external tooling
                log::info!("collector advertises firmware {}", version);
            }
        }
        Err(e) => {
            log::warn!("config fetch failed ({}), using local defaults", e);
        }
    }

    let mut engine = CaptureEngine::new(config);

    let (sample_tx, mut sample_rx) = mpsc::channel::<Sample>(500);
    let _sensor_handle = tokio::spawn(sensors::sample_loop(
        sample_tx,
        args.period_ms,
        args.shock_every,
    ));

    let start = Utc::now();
    let mut last_heartbeat = Instant::now();
    let mut notifications_sent = 0u64;
    let mut waveforms_sent = 0u64;

    println!("[{}] Monitoring...", ts_now());

    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }

        while let Ok(sample) = sample_rx.try_recv() {
            let out = engine.process_sample(sample);

            if let Some(notification) = out.notification {
                // Fire-and-forget so the alert path never stalls sampling
                let client = client.clone();
                notifications_sent += 1;
                tokio::spawn(async move {
                    if let Err(e) = client.post_notification(&notification).await {
                        log::warn!("notification send failed ({}), event dropped", e);
                    }
                });
            }

            if let Some(report) = out.waveform {
                println!(
                    "[{}] Event captured: {} peak={:.4}g, {} waveform entries",
                    ts_now(),
                    report.level,
                    report.delta_g,
                    report.waveform.len()
                );
                // The one accepted cadence violation: uploading at episode
                // completion blocks the tick loop on network I/O
                match client.post_waveform(&report).await {
                    Ok(()) => waveforms_sent += 1,
                    Err(e) => log::warn!("waveform send failed ({}), payload dropped", e),
                }
            }
        }

        // Connectivity check, skipped during capture to keep sampling smooth
        if !engine.is_capturing()
            && last_heartbeat.elapsed() >= Duration::from_millis(heartbeat_interval_ms)
        {
            last_heartbeat = Instant::now();
            match client.heartbeat().await {
                Ok(HeartbeatOutcome::Ok) => log::debug!("heartbeat ok"),
                Ok(HeartbeatOutcome::RestartRequested) => {
                    println!("[{}] Collector requested restart, exiting", ts_now());
                    break;
                }
                Err(e) => log::warn!("heartbeat failed: {}", e),
            }
        }

        sleep(Duration::from_millis(1)).await;
    }

    println!("\n=== Final Stats ===");
    println!("Samples processed: {}", engine.samples_processed());
    println!("Events captured: {}", engine.events_captured());
    println!("Notifications sent: {}", notifications_sent);
    println!("Waveforms uploaded: {}", waveforms_sent);

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
