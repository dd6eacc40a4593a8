use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives completion percentages while a sheet is composed. Values are
/// non-decreasing, in `0..=100`, delivered once per placed item, and the last
/// one is always 100.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressReporter for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Discards every notification.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Percentage reported after `done` of `total` items, rounded down.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    (done * 100 / total as u128) as u8
}

/// Shared flag checked by the composer between items.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
