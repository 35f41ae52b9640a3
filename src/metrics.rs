//! Process-wide protocol counters.
//!
//! Plain relaxed atomics; a [`Snapshot`] is logged when a session ends.
use std::sync::atomic::{AtomicU64, Ordering};

static LINES_FRAMED: AtomicU64 = AtomicU64::new(0);
static TELEMETRY_RECORDS: AtomicU64 = AtomicU64::new(0);
static NOISE_DROPPED: AtomicU64 = AtomicU64::new(0);
static BULK_FRAMES: AtomicU64 = AtomicU64::new(0);
static ANALYSES_COMPLETED: AtomicU64 = AtomicU64::new(0);
static ANALYSES_FAILED: AtomicU64 = AtomicU64::new(0);
static ANALYSES_TIMED_OUT: AtomicU64 = AtomicU64::new(0);
static THRESHOLD_PUSHES: AtomicU64 = AtomicU64::new(0);
static WRITE_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_lines_framed(n: u64) {
    LINES_FRAMED.fetch_add(n, Ordering::Relaxed);
}
pub fn inc_telemetry_records() {
    TELEMETRY_RECORDS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_noise_dropped() {
    NOISE_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_bulk_frames() {
    BULK_FRAMES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_analyses_completed() {
    ANALYSES_COMPLETED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_analyses_failed() {
    ANALYSES_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_analyses_timed_out() {
    ANALYSES_TIMED_OUT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_threshold_pushes() {
    THRESHOLD_PUSHES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_write_failures() {
    WRITE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub lines_framed: u64,
    pub telemetry_records: u64,
    pub noise_dropped: u64,
    pub bulk_frames: u64,
    pub analyses_completed: u64,
    pub analyses_failed: u64,
    pub analyses_timed_out: u64,
    pub threshold_pushes: u64,
    pub write_failures: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        lines_framed: LINES_FRAMED.load(Ordering::Relaxed),
        telemetry_records: TELEMETRY_RECORDS.load(Ordering::Relaxed),
        noise_dropped: NOISE_DROPPED.load(Ordering::Relaxed),
        bulk_frames: BULK_FRAMES.load(Ordering::Relaxed),
        analyses_completed: ANALYSES_COMPLETED.load(Ordering::Relaxed),
        analyses_failed: ANALYSES_FAILED.load(Ordering::Relaxed),
        analyses_timed_out: ANALYSES_TIMED_OUT.load(Ordering::Relaxed),
        threshold_pushes: THRESHOLD_PUSHES.load(Ordering::Relaxed),
        write_failures: WRITE_FAILURES.load(Ordering::Relaxed),
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lines={} telemetry={} noise={} bulk={} analyses ok={} failed={} timeout={} thresholds={} write_failures={}",
            self.lines_framed,
            self.telemetry_records,
            self.noise_dropped,
            self.bulk_frames,
            self.analyses_completed,
            self.analyses_failed,
            self.analyses_timed_out,
            self.threshold_pushes,
            self.write_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_move_forward() {
        let before = snapshot();
        inc_noise_dropped();
        inc_lines_framed(3);
        let after = snapshot();
        // Other tests share the statics; only monotonic growth is stable.
        assert!(after.noise_dropped >= before.noise_dropped + 1);
        assert!(after.lines_framed >= before.lines_framed + 3);
    }
}
