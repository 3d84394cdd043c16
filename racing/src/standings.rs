use std::fmt;

use tracing::info;

use crate::PlayerId;

/// Finish order, stroke counts and race completion for one session.
#[derive(Clone, Debug)]
pub struct Standings {
    finished_count: u32,
    /// Finish order per player slot, 0 while unfinished.
    finish_order: Vec<u32>,
    strokes: Vec<u32>,
    race_complete: bool,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub place: usize,
    pub player: PlayerId,
    pub finish_order: u32,
    pub strokes: u32,
    pub score: u32,
}

impl fmt::Display for LeaderboardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) Player {} {} pts", self.place, self.player, self.score)
    }
}

impl Standings {
    pub fn new(player_count: usize) -> Self {
        Self {
            finished_count: 0,
            finish_order: vec![0; player_count],
            strokes: vec![0; player_count],
            race_complete: false,
        }
    }

    pub fn player_count(&self) -> usize {
        self.finish_order.len()
    }

    pub fn finished_count(&self) -> u32 {
        self.finished_count
    }

    pub fn is_race_complete(&self) -> bool {
        self.race_complete
    }

    /// Finish order of `player`, 0 while unfinished.
    pub fn finish_order(&self, player: PlayerId) -> u32 {
        player
            .slot()
            .and_then(|slot| self.finish_order.get(slot).copied())
            .unwrap_or(0)
    }

    pub fn strokes(&self, player: PlayerId) -> u32 {
        player
            .slot()
            .and_then(|slot| self.strokes.get(slot).copied())
            .unwrap_or(0)
    }

    pub fn add_stroke(&mut self, player: PlayerId) {
        if let Some(count) = player.slot().and_then(|slot| self.strokes.get_mut(slot)) {
            *count += 1;
        }
    }

    pub fn reset_strokes(&mut self) {
        self.strokes.iter_mut().for_each(|count| *count = 0);
    }

    /// Record a finisher. Returns its finishing place, or `None` if the id is
    /// unknown or the player already finished.
    pub fn player_finished(&mut self, player: PlayerId) -> Option<u32> {
        let slot = player.slot().filter(|&slot| slot < self.finish_order.len())?;
        if self.finish_order[slot] != 0 {
            return None;
        }

        if self.player_count() == 1 {
            self.mark_complete();
        }

        self.finished_count += 1;
        self.finish_order[slot] = self.finished_count;
        info!(%player, place = self.finished_count, "player finished");

        if self.finished_count as usize == self.player_count() {
            self.mark_complete();
        }
        Some(self.finished_count)
    }

    fn mark_complete(&mut self) {
        if !self.race_complete {
            self.race_complete = true;
            info!("race complete");
        }
    }

    /// Leaderboard ordered best first. Each player scores
    /// `position_weight * finish_order + strokes`; lower is better and ties
    /// keep finishing order. Unfinished players rank as finishing last.
    pub fn leaderboard(&self, position_weight: u32) -> Vec<LeaderboardEntry> {
        let last = self.player_count() as u32 + 1;
        let mut entries: Vec<LeaderboardEntry> = (0..self.player_count())
            .map(|slot| {
                let finish_order = self.finish_order[slot];
                let effective_order = if finish_order == 0 { last } else { finish_order };
                LeaderboardEntry {
                    place: 0,
                    player: PlayerId::from_slot(slot),
                    finish_order,
                    strokes: self.strokes[slot],
                    score: position_weight * effective_order + self.strokes[slot],
                }
            })
            .collect();

        entries.sort_by_key(|entry| {
            let order = if entry.finish_order == 0 {
                last
            } else {
                entry.finish_order
            };
            (entry.score, order)
        });
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.place = index + 1;
        }
        entries
    }
}

/// Post-race text for a solo race.
pub fn stroke_summary(strokes: u32) -> String {
    format!("Race end : {strokes} Strokes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_finish_completes_the_race_immediately() {
        let mut standings = Standings::new(1);
        assert!(!standings.is_race_complete());
        assert_eq!(standings.player_finished(PlayerId(1)), Some(1));
        assert!(standings.is_race_complete());
        assert_eq!(standings.finish_order(PlayerId(1)), 1);
    }

    #[test]
    fn multiplayer_completes_when_everyone_finished() {
        let mut standings = Standings::new(2);
        assert_eq!(standings.player_finished(PlayerId(2)), Some(1));
        assert!(!standings.is_race_complete());
        assert_eq!(standings.player_finished(PlayerId(1)), Some(2));
        assert!(standings.is_race_complete());
        assert_eq!(standings.finish_order(PlayerId(2)), 1);
        assert_eq!(standings.finish_order(PlayerId(1)), 2);
    }

    #[test]
    fn finishing_twice_or_with_unknown_ids_is_ignored() {
        let mut standings = Standings::new(2);
        standings.player_finished(PlayerId(1));
        assert_eq!(standings.player_finished(PlayerId(1)), None);
        assert_eq!(standings.player_finished(PlayerId(0)), None);
        assert_eq!(standings.player_finished(PlayerId(9)), None);
        assert_eq!(standings.finished_count(), 1);
        assert!(!standings.is_race_complete());
    }

    #[test]
    fn faster_finisher_with_more_strokes_can_still_win() {
        let mut standings = Standings::new(2);
        for _ in 0..3 {
            standings.add_stroke(PlayerId(1));
        }
        for _ in 0..2 {
            standings.add_stroke(PlayerId(2));
        }
        standings.player_finished(PlayerId(1));
        standings.player_finished(PlayerId(2));

        let board = standings.leaderboard(5);
        assert_eq!(board[0].player, PlayerId(1));
        assert_eq!(board[0].score, 8);
        assert_eq!(board[1].player, PlayerId(2));
        assert_eq!(board[1].score, 12);
        assert_eq!(board[0].to_string(), "1) Player 1 8 pts");
        assert_eq!(board[1].to_string(), "2) Player 2 12 pts");
    }

    #[test]
    fn fewer_strokes_can_beat_the_first_finisher() {
        let mut standings = Standings::new(2);
        for _ in 0..9 {
            standings.add_stroke(PlayerId(1));
        }
        standings.add_stroke(PlayerId(2));
        standings.player_finished(PlayerId(1));
        standings.player_finished(PlayerId(2));

        let board = standings.leaderboard(5);
        assert_eq!(board[0].player, PlayerId(2));
        assert_eq!(board[0].score, 11);
        assert_eq!(board[1].player, PlayerId(1));
        assert_eq!(board[1].score, 14);
    }

    #[test]
    fn equal_scores_fall_back_to_finish_order() {
        let mut standings = Standings::new(2);
        for _ in 0..5 {
            standings.add_stroke(PlayerId(2));
        }
        standings.player_finished(PlayerId(2));
        standings.player_finished(PlayerId(1));
        // Player 2: 5 * 1 + 5 = 10, player 1: 5 * 2 + 0 = 10.
        let board = standings.leaderboard(5);
        assert_eq!(board[0].score, board[1].score);
        assert_eq!(board[0].player, PlayerId(2));
        assert_eq!(board[1].player, PlayerId(1));
    }

    #[test]
    fn reset_strokes_clears_every_counter() {
        let mut standings = Standings::new(2);
        standings.add_stroke(PlayerId(1));
        standings.add_stroke(PlayerId(2));
        standings.reset_strokes();
        assert_eq!(standings.strokes(PlayerId(1)), 0);
        assert_eq!(standings.strokes(PlayerId(2)), 0);
    }

    #[test]
    fn summary_reads_like_the_hud() {
        assert_eq!(stroke_summary(7), "Race end : 7 Strokes");
    }
}
