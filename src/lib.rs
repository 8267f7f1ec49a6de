//! Single-node vibration monitor.
//!
//! Samples a 3-axis accelerometer at a fixed cadence, detects transient
//! events against configurable severity thresholds, and reports both simple
//! event notifications and full before/after waveform captures to a remote
//! collector.
//!
//! The core is the event-capture engine in [`capture`]: a sliding pre-event
//! ring buffer, an IDLE/CAPTURING trigger state machine with monotonic
//! severity escalation, a fixed post-event buffer, and a chronological
//! waveform serializer. Everything engine-side runs on one logical thread
//! of control (the tick loop task); the sensor source and the collector
//! uplink are the only async collaborators.

pub mod buffers;
pub mod capture;
pub mod config;
pub mod sensors;
pub mod trigger;
pub mod uplink;
pub mod waveform;

pub use capture::{CaptureEngine, TickOutput};
pub use config::{EngineConfig, Thresholds};
pub use sensors::Sample;
pub use trigger::Severity;
