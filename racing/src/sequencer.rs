//! Race lifecycle: pre-race → countdown → race → post-race → restart.
//!
//! The sequencer only keeps time and decides when to move on. What happens on
//! entering a phase (toggling input, showing displays, building the
//! leaderboard) is done by the session when it receives the cue.

use tracing::info;

use crate::config::RaceSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    PreRace,
    Countdown,
    InRace,
    PostRace,
}

/// Something the session must act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Enter(Phase),
    /// The start grace period is over; hide the countdown displays.
    HideCountdown,
    /// Post-race is over; tear the session down and build a new one.
    Restart,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseTimings {
    pub pre_race: f32,
    pub countdown: f32,
    pub countdown_grace: f32,
    pub post_race: f32,
}

impl From<&RaceSettings> for PhaseTimings {
    fn from(settings: &RaceSettings) -> Self {
        Self {
            pre_race: settings.pre_race_secs.max(0.0),
            countdown: settings.countdown_secs.max(0.0),
            countdown_grace: settings.countdown_grace_secs.max(0.0),
            post_race: settings.post_race_secs.max(0.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RaceSequencer {
    timings: PhaseTimings,
    phase: Phase,
    elapsed: f32,
    countdown_hidden: bool,
    restart_requested: bool,
}

impl RaceSequencer {
    /// A sequencer sitting at the start of pre-race.
    pub fn new(timings: PhaseTimings) -> Self {
        Self {
            timings,
            phase: Phase::PreRace,
            elapsed: 0.0,
            countdown_hidden: false,
            restart_requested: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seconds spent in the current phase.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn timings(&self) -> PhaseTimings {
        self.timings
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// Seconds left before the race starts, while counting down.
    pub fn countdown_remaining(&self) -> Option<f32> {
        match self.phase {
            Phase::Countdown => Some((self.timings.countdown - self.elapsed).max(0.0)),
            _ => None,
        }
    }

    /// Advance by `dt`. `race_complete` is read after every player has been
    /// processed for the tick. Cues come back in the order they happened.
    pub fn tick(&mut self, dt: f32, race_complete: bool) -> Vec<Cue> {
        let mut cues = Vec::new();
        self.elapsed += dt.max(0.0);

        loop {
            match self.phase {
                Phase::PreRace if self.elapsed >= self.timings.pre_race => {
                    self.enter(Phase::Countdown, self.timings.pre_race, &mut cues);
                }
                Phase::Countdown if self.elapsed >= self.timings.countdown => {
                    self.enter(Phase::InRace, self.timings.countdown, &mut cues);
                }
                Phase::InRace if self.elapsed >= self.timings.countdown_grace => {
                    if !self.countdown_hidden {
                        self.countdown_hidden = true;
                        cues.push(Cue::HideCountdown);
                    }
                    if !race_complete {
                        break;
                    }
                    // Post-race timing starts from the tick that saw completion.
                    self.enter(Phase::PostRace, self.elapsed, &mut cues);
                }
                Phase::PostRace if self.elapsed >= self.timings.post_race => {
                    if !self.restart_requested {
                        self.restart_requested = true;
                        info!("post-race over, restarting");
                        cues.push(Cue::Restart);
                    }
                    break;
                }
                _ => break,
            }
        }
        cues
    }

    fn enter(&mut self, next: Phase, spent: f32, cues: &mut Vec<Cue>) {
        info!(from = ?self.phase, to = ?next, "race phase change");
        self.phase = next;
        self.elapsed = (self.elapsed - spent).max(0.0);
        cues.push(Cue::Enter(next));
    }
}
