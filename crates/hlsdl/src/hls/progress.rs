use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// Pipeline phases, numbered in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskPhase {
    LoadEngine = 0,
    ParsePlaylist = 1,
    DownloadSegment = 2,
    Merge = 3,
}

impl TaskPhase {
    pub const ALL: [TaskPhase; 4] = [
        TaskPhase::LoadEngine,
        TaskPhase::ParsePlaylist,
        TaskPhase::DownloadSegment,
        TaskPhase::Merge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskPhase::LoadEngine => "load engine",
            TaskPhase::ParsePlaylist => "parse playlist",
            TaskPhase::DownloadSegment => "download segments",
            TaskPhase::Merge => "merge",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub phase: TaskPhase,
    /// Completion of `phase`, in `[0, 1]`
    pub fraction: f64,
}

/// A callback function for progress updates.
pub type OnProgress = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Forwards progress to an optional sink, one instance per download call.
///
/// Fractions are clamped to `[0, 1]` and a value lower than the last one seen
/// for the same phase is dropped. A panicking sink is contained and logged.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<OnProgress>,
    last: Arc<Mutex<[Option<f64>; 4]>>,
}

impl ProgressReporter {
    pub fn new(sink: Option<OnProgress>) -> Self {
        Self {
            sink,
            last: Arc::new(Mutex::new([None; 4])),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn report(&self, phase: TaskPhase, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        {
            let mut last = self.last.lock();
            let slot = &mut last[phase as usize];
            if slot.is_some_and(|previous| fraction < previous) {
                return;
            }
            *slot = Some(fraction);
        }

        let Some(sink) = &self.sink else {
            return;
        };
        let event = ProgressEvent { phase, fraction };
        if panic::catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
            warn!(phase = %phase, fraction, "Progress callback panicked; ignoring");
        }
    }

    /// Last fraction reported for `phase`.
    pub fn last(&self, phase: TaskPhase) -> Option<f64> {
        self.last.lock()[phase as usize]
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_sink", &self.sink.is_some())
            .field("last", &*self.last.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting() -> (ProgressReporter, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let reporter = ProgressReporter::new(Some(Arc::new(move |event: ProgressEvent| {
            sink_events.lock().push(event);
        })));
        (reporter, events)
    }

    #[test]
    fn test_regressions_are_dropped_per_phase() {
        let (reporter, events) = collecting();
        reporter.report(TaskPhase::DownloadSegment, 0.5);
        reporter.report(TaskPhase::DownloadSegment, 0.25);
        reporter.report(TaskPhase::Merge, 0.0);
        reporter.report(TaskPhase::DownloadSegment, 0.5);
        reporter.report(TaskPhase::DownloadSegment, 1.0);

        let fractions: Vec<_> = events
            .lock()
            .iter()
            .filter(|e| e.phase == TaskPhase::DownloadSegment)
            .map(|e| e.fraction)
            .collect();
        assert_eq!(fractions, vec![0.5, 0.5, 1.0]);
        assert_eq!(reporter.last(TaskPhase::Merge), Some(0.0));
    }

    #[test]
    fn test_fraction_is_clamped() {
        let (reporter, events) = collecting();
        reporter.report(TaskPhase::Merge, 1.7);
        reporter.report(TaskPhase::LoadEngine, f64::NAN);
        let events = events.lock();
        assert_eq!(events[0].fraction, 1.0);
        assert_eq!(events[1].fraction, 0.0);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let reporter = ProgressReporter::new(Some(Arc::new(|event: ProgressEvent| {
            if event.fraction >= 0.0 {
                panic!("observer bug");
            }
        })));
        reporter.report(TaskPhase::ParsePlaylist, 0.0);
        reporter.report(TaskPhase::ParsePlaylist, 1.0);
        assert_eq!(reporter.last(TaskPhase::ParsePlaylist), Some(1.0));
    }

    #[test]
    fn test_disabled_reporter_tracks_state() {
        let reporter = ProgressReporter::disabled();
        reporter.report(TaskPhase::LoadEngine, 1.0);
        assert_eq!(reporter.last(TaskPhase::LoadEngine), Some(1.0));
    }

    #[test]
    fn test_phase_numbering() {
        assert_eq!(TaskPhase::LoadEngine as u8, 0);
        assert_eq!(TaskPhase::Merge as u8, 3);
        assert_eq!(TaskPhase::DownloadSegment.to_string(), "download segments");
    }
}
