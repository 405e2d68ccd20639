//! Overload ("drown") detection across dispatch cycles.

/// How a dispatch cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The queue was emptied within the time budget.
    Drained,
    /// The time budget ran out with `remaining` packets still queued.
    CutShort { remaining: usize },
}

/// Tracks whether the dispatch cycle keeps falling behind.
///
/// A cycle that drains the queue clears the flag. A cycle that is cut short
/// raises it only if the previous cycle was cut short too and left more
/// packets behind than this one.
#[derive(Clone, Debug, Default)]
pub struct OverloadDetector {
    previous_remaining: usize,
    overloaded: bool,
}

impl OverloadDetector {
    /// Create a detector with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the outcome of a cycle and return the new flag.
    pub fn record(&mut self, outcome: CycleOutcome) -> bool {
        match outcome {
            CycleOutcome::Drained => {
                self.overloaded = false;
                self.previous_remaining = 0;
            }
            CycleOutcome::CutShort { remaining } => {
                // Flags a shrinking backlog, not a growing one.
                self.overloaded =
                    self.previous_remaining != 0 && self.previous_remaining > remaining;
                self.previous_remaining = remaining;
            }
        }
        self.overloaded
    }

    /// Current overload flag.
    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    /// Backlog left by the last cut-short cycle, 0 after a drained cycle.
    pub fn previous_remaining(&self) -> usize {
        self.previous_remaining
    }
}
