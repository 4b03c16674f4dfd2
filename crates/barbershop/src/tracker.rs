//! Outstanding-client bookkeeping.
//!
//! The tracker is not synchronized on its own. It lives inside the server's
//! exclusive region so that the decrement and the sleep decision it drives are
//! a single atomic step with respect to service wake-ups.

/// Where the run stands after a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Clients are still outstanding.
    Remaining(usize),
    /// Every expected client has reported.
    Drained,
}

impl Progress {
    pub fn is_drained(&self) -> bool {
        matches!(self, Progress::Drained)
    }
}

/// Counts clients that have not yet been served or turned away.
#[derive(Debug)]
pub struct CompletionTracker {
    expected: usize,
    outstanding: usize,
}

impl CompletionTracker {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            outstanding: expected,
        }
    }

    /// Record one finished client (served or rejected).
    ///
    /// Must be called exactly once per client. Reporting more often than the
    /// expected count is a bug in the caller.
    pub fn report_done(&mut self) -> Progress {
        if self.outstanding == 0 {
            debug_assert!(false, "completion reported after all clients finished");
            tracing::error!(
                expected = self.expected,
                "Bug: completion reported after all clients finished"
            );
            return Progress::Drained;
        }

        self.outstanding -= 1;
        if self.outstanding == 0 {
            Progress::Drained
        } else {
            Progress::Remaining(self.outstanding)
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_drained(&self) -> bool {
        self.outstanding == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_to_drained() {
        let mut tracker = CompletionTracker::new(3);

        assert_eq!(tracker.report_done(), Progress::Remaining(2));
        assert_eq!(tracker.report_done(), Progress::Remaining(1));
        assert!(!tracker.is_drained());
        assert_eq!(tracker.report_done(), Progress::Drained);

        assert!(tracker.is_drained());
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn single_client_drains_immediately() {
        let mut tracker = CompletionTracker::new(1);
        assert!(tracker.report_done().is_drained());
    }

    #[test]
    fn counts_are_monotonic() {
        let mut tracker = CompletionTracker::new(5);
        let mut last = tracker.outstanding();
        for _ in 0..5 {
            tracker.report_done();
            assert_eq!(tracker.outstanding(), last - 1);
            last = tracker.outstanding();
        }
    }
}
