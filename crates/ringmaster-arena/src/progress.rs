//! Per-participant checkpoint progress.

use std::time::Duration;

use ringmaster_core::PropHandle;

/// When and in what position a participant finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishRecord {
    /// 1-based finishing position.
    pub rank: u32,
    /// Time since the session went live.
    pub elapsed: Duration,
}

/// What a single movement meant for a participant's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    /// Nothing changed.
    Nothing,
    /// The next expected checkpoint was entered and counted.
    Checkpoint { index: usize, total: usize },
    /// Every checkpoint is done and the finish region was entered.
    ReachedFinish,
    /// The tracker is terminal; the movement was ignored.
    AlreadyFinished,
}

/// Ordered-checkpoint state for one participant in one session.
///
/// `next_checkpoint` only ever grows and is capped at the checkpoint count.
/// Once a finish is recorded the tracker is terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    next_checkpoint: usize,
    finish: Option<FinishRecord>,
    prop: Option<PropHandle>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the checkpoint the participant must enter next.
    pub fn next_checkpoint(&self) -> usize {
        self.next_checkpoint
    }

    /// Counts the next checkpoint. Returns `false` (and changes nothing) if
    /// all `total` checkpoints are already counted or the tracker is
    /// terminal, so lingering inside a region is harmless.
    pub fn advance(&mut self, total: usize) -> bool {
        if self.finish.is_some() || self.next_checkpoint >= total {
            return false;
        }
        self.next_checkpoint += 1;
        true
    }

    pub fn has_completed_all(&self, total: usize) -> bool {
        self.next_checkpoint >= total
    }

    /// Records the finish once. Later calls keep the first record and
    /// return the rank it was given.
    pub fn mark_finished(&mut self, rank: u32, elapsed: Duration) -> u32 {
        self.finish.get_or_insert(FinishRecord { rank, elapsed }).rank
    }

    pub fn is_finished(&self) -> bool {
        self.finish.is_some()
    }

    pub fn finish(&self) -> Option<FinishRecord> {
        self.finish
    }

    pub fn final_position(&self) -> Option<u32> {
        self.finish.map(|f| f.rank)
    }

    /// Attaches a prop, returning whatever was attached before.
    pub fn attach_prop(&mut self, prop: PropHandle) -> Option<PropHandle> {
        self.prop.replace(prop)
    }

    pub fn prop(&self) -> Option<PropHandle> {
        self.prop
    }

    pub fn take_prop(&mut self) -> Option<PropHandle> {
        self.prop.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_stops_at_total() {
        let mut t = ProgressTracker::new();
        assert!(t.advance(2));
        assert!(t.advance(2));
        assert!(!t.advance(2));
        assert!(!t.advance(2));
        assert_eq!(t.next_checkpoint(), 2);
        assert!(t.has_completed_all(2));
    }

    #[test]
    fn test_advance_any_sequence_is_monotonic_and_bounded() {
        // Interleave advances against several totals, as a session whose
        // arena shrank never would, and check the invariant holds anyway.
        let totals = [3usize, 0, 5, 3, 1, 7, 2, 4];
        let mut t = ProgressTracker::new();
        let mut last = 0;
        for round in 0..50 {
            let total = totals[round % totals.len()];
            t.advance(total);
            assert!(t.next_checkpoint() >= last);
            last = t.next_checkpoint();
        }
        assert!(t.next_checkpoint() <= 7);
    }

    #[test]
    fn test_advance_with_zero_checkpoints_is_complete() {
        let mut t = ProgressTracker::new();
        assert!(!t.advance(0));
        assert!(t.has_completed_all(0));
    }

    #[test]
    fn test_mark_finished_is_idempotent() {
        let mut t = ProgressTracker::new();
        let first = t.mark_finished(3, Duration::from_secs(40));
        let second = t.mark_finished(1, Duration::from_secs(99));

        assert_eq!(first, 3);
        assert_eq!(second, 3);
        assert_eq!(t.finish().unwrap().elapsed, Duration::from_secs(40));
        assert_eq!(t.final_position(), Some(3));
    }

    #[test]
    fn test_advance_after_finish_is_ignored() {
        let mut t = ProgressTracker::new();
        t.mark_finished(1, Duration::ZERO);
        assert!(!t.advance(5));
        assert_eq!(t.next_checkpoint(), 0);
    }

    #[test]
    fn test_attach_prop_replaces_and_take_clears() {
        let mut t = ProgressTracker::new();
        assert_eq!(t.attach_prop(PropHandle(1)), None);
        assert_eq!(t.attach_prop(PropHandle(2)), Some(PropHandle(1)));
        assert_eq!(t.take_prop(), Some(PropHandle(2)));
        assert_eq!(t.prop(), None);
    }
}
