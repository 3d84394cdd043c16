use std::collections::VecDeque;

use crate::PlayerId;

/// Raw axis values inside this band count as no steering.
pub const STEER_DEADZONE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    ChargePressed,
    ChargeReleased,
    HornPressed,
    HornReleased,
    /// Raw steering axis in [-1, 1].
    Steer(f32),
    RespawnRequested,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    pub player: PlayerId,
    pub action: InputAction,
}

impl InputEvent {
    pub fn new(player: PlayerId, action: InputAction) -> Self {
        Self { player, action }
    }
}

/// Input gathered between two update ticks, consumed in arrival order.
#[derive(Default, Debug)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub fn apply_deadzone(raw: f32) -> f32 {
    if raw.abs() <= STEER_DEADZONE {
        0.0
    } else {
        raw.clamp(-1.0, 1.0)
    }
}
