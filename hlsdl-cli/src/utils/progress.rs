use std::sync::Arc;
use std::time::Duration;

use hlsdl_engine::{ProgressEvent, TaskPhase};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;

/// Bar resolution: fractions are mapped onto `0..=STEPS`.
const STEPS: u64 = 1000;

fn phase_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/white}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// One progress bar per pipeline phase, created when the phase first reports.
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bars: Arc<Mutex<[Option<ProgressBar>; 4]>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(Default::default())),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            disabled: true,
            ..Self::new(multi)
        }
    }

    pub fn handle_event(&self, event: ProgressEvent) {
        if self.disabled {
            return;
        }

        let mut bars = self.bars.lock();
        let bar = bars[event.phase as usize].get_or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(STEPS));
            bar.set_style(phase_style());
            bar.set_message(format!("[{}] {}", event.phase as u8, event.phase));
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        });

        bar.set_position((event.fraction * STEPS as f64).round() as u64);
        if event.fraction >= 1.0 && !bar.is_finished() {
            bar.finish_with_message(format!("[{}] {} done", event.phase as u8, event.phase));
        }
    }

    /// Abandons bars of phases that never completed.
    pub fn abandon_unfinished(&self) {
        let bars = self.bars.lock();
        for bar in bars.iter().flatten().filter(|bar| !bar.is_finished()) {
            bar.abandon();
        }
    }

    #[inline]
    #[allow(unused)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[cfg(test)]
    fn position(&self, phase: TaskPhase) -> Option<u64> {
        let bars = self.bars.lock();
        bars[phase as usize].as_ref().map(ProgressBar::position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn test_bar_per_phase() {
        let manager = ProgressManager::new(hidden());
        manager.handle_event(ProgressEvent {
            phase: TaskPhase::DownloadSegment,
            fraction: 0.25,
        });
        manager.handle_event(ProgressEvent {
            phase: TaskPhase::Merge,
            fraction: 1.0,
        });
        assert_eq!(manager.position(TaskPhase::DownloadSegment), Some(250));
        assert_eq!(manager.position(TaskPhase::Merge), Some(STEPS));
        assert_eq!(manager.position(TaskPhase::LoadEngine), None);
    }

    #[test]
    fn test_disabled_manager_ignores_events() {
        let manager = ProgressManager::new_disabled(hidden());
        manager.handle_event(ProgressEvent {
            phase: TaskPhase::LoadEngine,
            fraction: 1.0,
        });
        assert!(manager.is_disabled());
        assert_eq!(manager.position(TaskPhase::LoadEngine), None);
    }

    #[test]
    fn test_events_from_other_threads_land_on_shared_bars() {
        let manager = ProgressManager::new(hidden());
        let handles: Vec<_> = (1..=4)
            .map(|step| {
                let sink = manager.clone();
                std::thread::spawn(move || {
                    sink.handle_event(ProgressEvent {
                        phase: TaskPhase::DownloadSegment,
                        fraction: step as f64 / 8.0,
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(manager.position(TaskPhase::DownloadSegment).is_some());
        manager.abandon_unfinished();
        let bars = manager.bars.lock();
        assert!(bars[TaskPhase::DownloadSegment as usize].as_ref().unwrap().is_finished());
    }
}
