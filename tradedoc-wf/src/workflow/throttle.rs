//! Event broadcast throttling
//!
//! Remote processing can push status updates far faster than a UI needs to
//! repaint, so progress events are rate-limited before they reach the event
//! bus. Lifecycle milestones (started, ready, failed, removed, restored,
//! mode/variant changes) are never throttled.

use std::time::{Duration, Instant};
use tracing::debug;
use tradedoc_common::events::{DocEvent, EventBus};

/// Event bus frontend with throttling for high-frequency progress events
pub struct EventBroadcaster {
    bus: EventBus,
    /// Last emission time for throttled events
    last_emission: Option<Instant>,
    throttle_interval: Duration,
}

impl EventBroadcaster {
    pub fn new(bus: EventBus, throttle_interval_ms: u64) -> Self {
        Self {
            bus,
            last_emission: None,
            throttle_interval: Duration::from_millis(throttle_interval_ms),
        }
    }

    /// Emit an event, rate-limiting processing progress updates
    ///
    /// Returns true if the event was sent, false if throttled.
    pub fn emit(&mut self, event: DocEvent) -> bool {
        let should_throttle = matches!(event, DocEvent::UploadProcessing { stage: Some(_), .. });

        if should_throttle {
            if let Some(last) = self.last_emission {
                if last.elapsed() < self.throttle_interval {
                    debug!(event_type = event.event_type(), "Throttling progress event");
                    return false;
                }
            }
            self.last_emission = Some(Instant::now());
        }

        self.bus.emit(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedoc_common::steps::Step;

    fn processing_event(stage: Option<&str>) -> DocEvent {
        DocEvent::UploadProcessing {
            step: Step::new(1).unwrap(),
            stage: stage.map(String::from),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn milestones_never_throttled() {
        let mut broadcaster = EventBroadcaster::new(EventBus::new(64), 1000);

        for _ in 0..5 {
            assert!(broadcaster.emit(DocEvent::StepModified {
                step: Step::new(2).unwrap(),
                timestamp: chrono::Utc::now(),
            }));
        }
    }

    #[test]
    fn progress_updates_respect_interval() {
        let mut broadcaster = EventBroadcaster::new(EventBus::new(64), 100);

        assert!(broadcaster.emit(processing_event(Some("ocr"))));
        assert!(!broadcaster.emit(processing_event(Some("fields"))));

        std::thread::sleep(Duration::from_millis(150));
        assert!(broadcaster.emit(processing_event(Some("layout"))));
    }

    #[test]
    fn stageless_processing_transition_is_a_milestone() {
        // The uploading→processing transition itself (no stage payload)
        // must always reach the UI.
        let mut broadcaster = EventBroadcaster::new(EventBus::new(64), 1000);

        assert!(broadcaster.emit(processing_event(Some("a"))));
        assert!(broadcaster.emit(processing_event(None)));
        assert!(broadcaster.emit(processing_event(None)));
    }
}
