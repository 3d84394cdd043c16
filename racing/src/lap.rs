use tracing::{debug, trace};

/// Result of reporting a checkpoint to a tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Out of order, repeated, or already finished.
    Ignored,
    Advanced { checkpoint: u32 },
    LapCompleted { lap: u32 },
    Finished,
}

/// Ordered checkpoint and lap progress for one player.
#[derive(Clone, Debug)]
pub struct LapTracker {
    total_laps: u32,
    checkpoint_count: u32,
    lap: u32,
    last_checkpoint: u32,
    finished: bool,
}

impl LapTracker {
    pub fn new(total_laps: u32, checkpoint_count: u32) -> Self {
        Self {
            total_laps,
            checkpoint_count,
            lap: 1,
            last_checkpoint: 0,
            finished: false,
        }
    }

    pub fn lap(&self) -> u32 {
        self.lap
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn last_checkpoint(&self) -> u32 {
        self.last_checkpoint
    }

    pub fn checkpoint_count(&self) -> u32 {
        self.checkpoint_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The checkpoint this tracker will accept next.
    pub fn next_checkpoint(&self) -> u32 {
        self.last_checkpoint + 1
    }

    pub fn passed_checkpoint(&mut self, index: u32) -> CheckpointOutcome {
        if self.finished {
            return CheckpointOutcome::Ignored;
        }
        if index != self.next_checkpoint() {
            trace!(
                index,
                expected = self.next_checkpoint(),
                "checkpoint out of order"
            );
            return CheckpointOutcome::Ignored;
        }

        if index == self.checkpoint_count {
            if self.lap == self.total_laps {
                self.finished = true;
                return CheckpointOutcome::Finished;
            }
            self.lap += 1;
            self.last_checkpoint = 0;
            debug!(lap = self.lap, "lap completed");
            return CheckpointOutcome::LapCompleted { lap: self.lap };
        }

        self.last_checkpoint = index;
        CheckpointOutcome::Advanced { checkpoint: index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(t: &LapTracker) -> (u32, u32, bool) {
        (t.lap(), t.last_checkpoint(), t.is_finished())
    }

    #[test]
    fn in_order_checkpoints_advance_and_wrap_the_lap() {
        let mut tracker = LapTracker::new(2, 3);
        assert_eq!(
            tracker.passed_checkpoint(1),
            CheckpointOutcome::Advanced { checkpoint: 1 }
        );
        assert_eq!(
            tracker.passed_checkpoint(2),
            CheckpointOutcome::Advanced { checkpoint: 2 }
        );
        assert_eq!(
            tracker.passed_checkpoint(3),
            CheckpointOutcome::LapCompleted { lap: 2 }
        );
        assert_eq!(snapshot(&tracker), (2, 0, false));
    }

    #[test]
    fn out_of_order_and_repeated_checkpoints_are_ignored() {
        let mut tracker = LapTracker::new(3, 4);
        tracker.passed_checkpoint(1);
        let before = snapshot(&tracker);

        for index in [0, 1, 3, 4, 7, u32::MAX] {
            assert_eq!(tracker.passed_checkpoint(index), CheckpointOutcome::Ignored);
            assert_eq!(snapshot(&tracker), before);
        }
    }

    #[test]
    fn skipping_to_the_last_checkpoint_does_not_complete_a_lap() {
        let mut tracker = LapTracker::new(1, 5);
        assert_eq!(tracker.passed_checkpoint(5), CheckpointOutcome::Ignored);
        assert_eq!(snapshot(&tracker), (1, 0, false));
    }

    #[test]
    fn final_checkpoint_of_final_lap_finishes_once() {
        let mut tracker = LapTracker::new(2, 2);
        for index in [1, 2, 1] {
            tracker.passed_checkpoint(index);
        }
        assert_eq!(tracker.passed_checkpoint(2), CheckpointOutcome::Finished);
        assert!(tracker.is_finished());

        let frozen = snapshot(&tracker);
        for index in [1, 2, 3] {
            assert_eq!(tracker.passed_checkpoint(index), CheckpointOutcome::Ignored);
        }
        assert_eq!(snapshot(&tracker), frozen);
    }

    #[test]
    fn single_checkpoint_track_counts_every_pass_as_a_lap() {
        let mut tracker = LapTracker::new(3, 1);
        assert_eq!(
            tracker.passed_checkpoint(1),
            CheckpointOutcome::LapCompleted { lap: 2 }
        );
        assert_eq!(
            tracker.passed_checkpoint(1),
            CheckpointOutcome::LapCompleted { lap: 3 }
        );
        assert_eq!(tracker.passed_checkpoint(1), CheckpointOutcome::Finished);
    }
}
