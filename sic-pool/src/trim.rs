//! Host memory-pressure signal and the periodic driver standing in for a
//! generational collector's post-sweep notification: a background thread
//! with a stop flag, joined on drop, driving a periodic callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Pressure relative to the host's configured high-load threshold.
/// Thresholds are fixed: high at 90%, medium at 70%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureLevel {
    Low,
    Medium,
    High,
}

impl PressureLevel {
    pub fn from_usage(bytes_used: usize, high_load_threshold: usize) -> Self {
        if high_load_threshold == 0 {
            return PressureLevel::Low;
        }
        let permille = (bytes_used as u128 * 1000) / high_load_threshold as u128;
        if permille >= 900 {
            PressureLevel::High
        } else if permille >= 700 {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        }
    }
}

/// Implemented by the embedding host to report memory usage ahead of a
/// trim sweep. The sharded pool never measures its own memory footprint —
/// it only reacts to what the host reports, treating the generational
/// collector as an external collaborator.
pub trait MemoryPressureSource: Send + Sync {
    /// Bytes the host process currently has in use.
    fn bytes_used(&self) -> usize;
    /// The host's configured high-load ceiling, in the same units as
    /// `bytes_used`. A value of zero is treated as "always low pressure".
    fn high_load_threshold(&self) -> usize;
}

/// A background thread invoking a callback once per `interval`, standing
/// in for a host generational collector's one-shot-per-sweep notification.
/// Stopped automatically on drop, same shape as `ExpirationHandle`.
pub struct PeriodicPressureSource {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PeriodicPressureSource {
    pub(crate) fn spawn<F>(interval: Duration, mut on_sweep: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let interval = if interval.is_zero() { Duration::from_millis(1) } else { interval };
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);

        let join = std::thread::spawn(move || {
            while !stop_thread.load(Ordering::Acquire) {
                std::thread::sleep(interval);
                on_sweep();
            }
        });

        PeriodicPressureSource { stop, join: Some(join) }
    }

    /// Stops the driver and waits for its thread to finish. Prefer this
    /// over relying on `Drop` in tests, so the join is observed explicitly.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PeriodicPressureSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn pressure_levels_match_fixed_thresholds() {
        assert_eq!(PressureLevel::from_usage(0, 100), PressureLevel::Low);
        assert_eq!(PressureLevel::from_usage(69, 100), PressureLevel::Low);
        assert_eq!(PressureLevel::from_usage(70, 100), PressureLevel::Medium);
        assert_eq!(PressureLevel::from_usage(89, 100), PressureLevel::Medium);
        assert_eq!(PressureLevel::from_usage(90, 100), PressureLevel::High);
        assert_eq!(PressureLevel::from_usage(1_000, 0), PressureLevel::Low);
    }

    #[test]
    fn periodic_source_invokes_callback_then_stops_cleanly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_thread = Arc::clone(&calls);
        let driver = PeriodicPressureSource::spawn(Duration::from_millis(2), move || {
            calls_thread.fetch_add(1, Ordering::Relaxed);
        });
        std::thread::sleep(Duration::from_millis(20));
        driver.stop();
        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
