//! Gameplay core for a split-screen wind-up kart racer.
//!
//! Players hold a button to wind their kart up, release it to shoot forward,
//! and race a fixed number of laps through ordered checkpoints. Hard knocks
//! stun. Everything here is plain state advanced by two ticks from the host:
//! [`Session::update`] once per frame and [`Session::physics_tick`] once per
//! fixed physics step.

use std::fmt;

pub mod body;
pub mod charge;
pub mod config;
pub mod course;
pub mod curve;
pub mod error;
pub mod input;
pub mod lap;
pub mod motion;
pub mod player;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod standings;
pub mod stun;
pub mod track;
pub mod track_format;

pub use body::Body;
pub use config::SessionConfig;
pub use error::SetupError;
pub use session::{PlayerHud, RaceEvent, Session};

/// 1-based player number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Index into per-player arrays, `None` for the invalid id 0.
    pub fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    pub fn from_slot(slot: usize) -> Self {
        PlayerId(slot as u8 + 1)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
