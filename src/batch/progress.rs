/// Rows finished so far out of the batch total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion in `[0, 1]`. An empty batch counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Receives progress after each chunk. Closures `Fn(Progress)` qualify.
pub trait ProgressObserver {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress),
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}
