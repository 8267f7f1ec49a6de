use crate::buffers::{PostEventBuffer, PreEventRing};
use crate::config::EngineConfig;
use crate::sensors::Sample;
use crate::trigger::{classify, Severity};
use crate::waveform::{render, round4, EventNotification, WaveformReport};

/// One in-flight capture: severity (escalates upward only), the largest
/// deviation seen so far, and the timestamp of the sample that tripped the
/// trigger. At most one episode exists at a time.
#[derive(Clone, Copy, Debug)]
pub struct Episode {
    pub level: Severity,
    pub peak_deviation: f64,
    pub trigger_ms: u64,
}

/// What one tick produced. The notification path is stateless and can fire
/// on any tick; a waveform report only appears on the tick that completes a
/// capture.
#[derive(Debug, Default)]
pub struct TickOutput {
    pub notification: Option<EventNotification>,
    pub waveform: Option<WaveformReport>,
}

/// The event-capture engine: pre-event ring, trigger state machine, and
/// post-event buffer, owned together so every mutation goes through one
/// place.
///
/// States are IDLE (episode absent, ring filling) and CAPTURING (episode
/// present, post buffer filling, ring frozen). The machine cycles for the
/// life of the process; a capture always runs to completion, exactly M
/// post-trigger samples, before the next trigger can open.
pub struct CaptureEngine {
    config: EngineConfig,
    ring: PreEventRing,
    post: PostEventBuffer,
    episode: Option<Episode>,
    samples_processed: u64,
    events_captured: u64,
}

impl CaptureEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ring = PreEventRing::new(config.pre_samples);
        let post = PostEventBuffer::new(config.post_samples);
        CaptureEngine {
            config,
            ring,
            post,
            episode: None,
            samples_processed: 0,
            events_captured: 0,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.episode.is_some()
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    pub fn events_captured(&self) -> u64 {
        self.events_captured
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Advance the engine by one tick. Samples must arrive in timestamp
    /// order; the buffers and the serializer preserve that order exactly.
    pub fn process_sample(&mut self, sample: Sample) -> TickOutput {
        self.samples_processed += 1;

        let classification = classify(&sample, &self.config.thresholds);

        // Stateless alert path: every sample is classified regardless of
        // capture state and reported immediately if non-quiet.
        let notification = classification.level.map(|level| EventNotification {
            id: self.config.device_id.clone(),
            level,
            delta_g: round4(classification.deviation),
        });

        let waveform = if let Some(mut episode) = self.episode.take() {
            // Ring stays frozen here so the pre-event window reflects the
            // lead-up to the trigger, not the event itself.
            if classification.deviation > episode.peak_deviation {
                episode.peak_deviation = classification.deviation;
                if let Some(level) = classification.level {
                    if level > episode.level {
                        episode.level = level;
                    }
                }
            }
            self.post.push(sample);

            if self.post.is_full() {
                let report = render(
                    &self.config.device_id,
                    self.ring.snapshot_chronological(),
                    self.post.samples(),
                    &episode,
                    sample.timestamp_ms,
                );
                // CAPTURING -> IDLE: stale pre-event context must not leak
                // into the next episode.
                self.ring.reset();
                self.post.clear();
                self.events_captured += 1;
                Some(report)
            } else {
                self.episode = Some(episode);
                None
            }
        } else if let Some(level) = classification.level {
            // IDLE -> CAPTURING. The boundary sample belongs to the trigger
            // instant itself and enters neither buffer: the ring keeps
            // strictly-before context, the post buffer collects
            // strictly-after.
            self.post.clear();
            self.episode = Some(Episode {
                level,
                peak_deviation: classification.deviation,
                trigger_ms: sample.timestamp_ms,
            });
            None
        } else {
            self.ring.push(sample);
            None
        };

        TickOutput {
            notification,
            waveform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use approx::assert_relative_eq;

    fn test_config() -> EngineConfig {
        EngineConfig {
            device_id: "aa:bb:cc:dd:ee:ff".to_string(),
            thresholds: Thresholds {
                minor: 0.035,
                moderate: 0.10,
                severe: 0.50,
            },
            pre_samples: 60,
            post_samples: 60,
            sample_period_ms: 50,
        }
    }

    fn quiet(ts: u64, dev: f64) -> Sample {
        Sample::new(ts, dev, 0.0, 0.0)
    }

    /// Feed `n` samples of constant deviation starting at `start_ms`,
    /// stepping 50 ms. Returns any waveform reports produced.
    fn feed(
        engine: &mut CaptureEngine,
        start_ms: u64,
        n: u64,
        dev: f64,
    ) -> Vec<WaveformReport> {
        let mut reports = Vec::new();
        for i in 0..n {
            let out = engine.process_sample(quiet(start_ms + i * 50, dev));
            if let Some(report) = out.waveform {
                reports.push(report);
            }
        }
        reports
    }

    #[test]
    fn test_idle_samples_never_trigger() {
        let mut engine = CaptureEngine::new(test_config());
        let reports = feed(&mut engine, 50, 200, 0.01);
        assert!(reports.is_empty());
        assert!(!engine.is_capturing());
    }

    #[test]
    fn test_trigger_opens_capture_without_retrigger() {
        let mut engine = CaptureEngine::new(test_config());
        feed(&mut engine, 50, 60, 0.01);

        let out = engine.process_sample(quiet(3050, 0.12));
        assert!(engine.is_capturing());
        assert!(out.waveform.is_none());
        assert_eq!(out.notification.unwrap().level, Severity::Moderate);

        // Fluctuating deviations during capture must not open a new episode:
        // exactly one report after exactly M post samples, none before.
        for i in 0..59 {
            let dev = if i % 2 == 0 { 0.02 } else { 0.15 };
            let out = engine.process_sample(quiet(3100 + i * 50, dev));
            assert!(out.waveform.is_none());
        }
        let out = engine.process_sample(quiet(3100 + 59 * 50, 0.02));
        assert!(out.waveform.is_some());
        assert!(!engine.is_capturing());
    }

    #[test]
    fn test_escalation_is_monotonic() {
        let mut config = test_config();
        config.post_samples = 3;
        let mut engine = CaptureEngine::new(config);

        // minor trigger, then severe, then moderate: final level is severe
        engine.process_sample(quiet(50, 0.04));
        engine.process_sample(quiet(100, 0.55));
        engine.process_sample(quiet(150, 0.12));
        let out = engine.process_sample(quiet(200, 0.01));

        let report = out.waveform.unwrap();
        assert_eq!(report.level, Severity::Severe);
        assert_relative_eq!(report.delta_g, 0.55);
    }

    #[test]
    fn test_peak_tracks_deviation_not_just_levels() {
        let mut config = test_config();
        config.post_samples = 2;
        let mut engine = CaptureEngine::new(config);

        engine.process_sample(quiet(50, 0.04));
        engine.process_sample(quiet(100, 0.09)); // below moderate, above peak
        let out = engine.process_sample(quiet(150, 0.01));

        let report = out.waveform.unwrap();
        assert_eq!(report.level, Severity::Minor);
        assert_relative_eq!(report.delta_g, 0.09);
    }

    #[test]
    fn test_trigger_sample_enters_neither_buffer() {
        let mut config = test_config();
        config.pre_samples = 4;
        config.post_samples = 2;
        let mut engine = CaptureEngine::new(config);

        feed(&mut engine, 50, 3, 0.01); // ring holds 3
        engine.process_sample(quiet(200, 0.12)); // trigger
        engine.process_sample(quiet(250, 0.01));
        let out = engine.process_sample(quiet(300, 0.01));

        let report = out.waveform.unwrap();
        // 3 pre + 2 post; the boundary sample at rel 0 appears nowhere
        assert_eq!(report.waveform.len(), 5);
        assert!(report.waveform.iter().all(|e| e.relative_ms() != 0));
    }

    #[test]
    fn test_ring_frozen_during_capture() {
        let mut config = test_config();
        config.pre_samples = 4;
        config.post_samples = 3;
        let mut engine = CaptureEngine::new(config);

        feed(&mut engine, 50, 4, 0.01); // fill ring: ts 50..200
        engine.process_sample(quiet(250, 0.12)); // trigger
        let reports = feed(&mut engine, 300, 3, 0.01); // post window

        // If the ring had kept filling during capture, the oldest pre
        // sample would have been evicted. The pre half must still span
        // ts 50..200 exactly.
        let report = &reports[0];
        let rel: Vec<i64> = report.waveform.iter().map(|e| e.relative_ms()).collect();
        assert_eq!(rel, vec![-200, -150, -100, -50, 50, 100, 150]);
    }

    #[test]
    fn test_notification_fires_during_capture_too() {
        let mut config = test_config();
        config.post_samples = 4;
        let mut engine = CaptureEngine::new(config);

        engine.process_sample(quiet(50, 0.12)); // trigger
        let out = engine.process_sample(quiet(100, 0.04));
        let n = out.notification.unwrap();
        assert_eq!(n.level, Severity::Minor);
        assert_relative_eq!(n.delta_g, 0.04);

        let out = engine.process_sample(quiet(150, 0.01));
        assert!(out.notification.is_none());
    }

    #[test]
    fn test_engine_reusable_after_capture() {
        let mut config = test_config();
        config.pre_samples = 3;
        config.post_samples = 2;
        let mut engine = CaptureEngine::new(config);

        feed(&mut engine, 50, 3, 0.01);
        engine.process_sample(quiet(200, 0.12));
        feed(&mut engine, 250, 2, 0.01);
        assert_eq!(engine.events_captured(), 1);
        assert!(!engine.is_capturing());

        // Second episode starts from an empty ring: only samples pushed
        // after the reset may appear as pre-event context.
        feed(&mut engine, 1000, 2, 0.01);
        engine.process_sample(quiet(1100, 0.6));
        let mut report = None;
        for i in 0..2 {
            let out = engine.process_sample(quiet(1150 + i * 50, 0.01));
            if out.waveform.is_some() {
                report = out.waveform;
            }
        }
        let report = report.unwrap();
        assert_eq!(report.waveform.len(), 4); // 2 pre + 2 post
        assert_eq!(report.waveform[0].relative_ms(), -100);
        assert_eq!(engine.events_captured(), 2);
    }

    /// End-to-end scenario: 60 idle samples, a moderate trigger, an
    /// escalation to severe mid-capture, and a full 60-sample post window.
    #[test]
    fn test_moderate_trigger_escalating_to_severe() {
        let mut engine = CaptureEngine::new(test_config());

        // 60 quiet samples at 50 ms cadence: ts 50..3000
        assert!(feed(&mut engine, 50, 60, 0.01).is_empty());

        // Trigger at ts 3050 with a moderate deviation
        let out = engine.process_sample(quiet(3050, 0.12));
        assert!(engine.is_capturing());
        assert_eq!(out.notification.as_ref().unwrap().level, Severity::Moderate);

        let mut reports = Vec::new();
        let mut post_ts = 3100;
        // 29 calm post samples
        for _ in 0..29 {
            let out = engine.process_sample(quiet(post_ts, 0.02));
            reports.extend(out.waveform);
            post_ts += 50;
        }
        // Escalating spike at post tick 30
        let out = engine.process_sample(quiet(post_ts, 0.55));
        assert!(out.waveform.is_none());
        post_ts += 50;
        // Fill the remaining 30 post slots
        for _ in 0..30 {
            let out = engine.process_sample(quiet(post_ts, 0.02));
            reports.extend(out.waveform);
            post_ts += 50;
        }

        assert_eq!(reports.len(), 1);
        assert!(!engine.is_capturing());

        let report = &reports[0];
        assert_eq!(report.level, Severity::Severe);
        assert_relative_eq!(report.delta_g, 0.55);
        assert_eq!(report.waveform.len(), 120); // 60 pre + 60 post

        // Chronological, relative to trigger: first pre at -3000, last pre
        // at -50, first post at +50, monotonically non-decreasing.
        assert_eq!(report.waveform[0].relative_ms(), -3000);
        assert_eq!(report.waveform[59].relative_ms(), -50);
        assert_eq!(report.waveform[60].relative_ms(), 50);
        assert!(report
            .waveform
            .windows(2)
            .all(|w| w[0].relative_ms() <= w[1].relative_ms()));

        // Rendered at the last post sample: offset = 60 * 50 ms
        assert_eq!(report.event_offset_ms, 3000);

        // Ring was reset on completion: an immediate next trigger would
        // carry no stale pre-event context.
        engine.process_sample(quiet(post_ts, 0.12));
        assert!(engine.is_capturing());
        let mut last = None;
        for i in 0..60 {
            let out = engine.process_sample(quiet(post_ts + 50 + i * 50, 0.01));
            if out.waveform.is_some() {
                last = out.waveform;
            }
        }
        assert_eq!(last.unwrap().waveform.len(), 60); // 0 pre + 60 post
    }
}
