//! One race session: the players, their standings and the lifecycle
//! sequencer, driven by the host's two ticks.
//!
//! Bodies are owned by the host. Every tick receives them as a slice indexed
//! by player slot (player 1 at index 0).

use bevy::math::Vec2;
use tracing::{debug, info, trace};

use crate::PlayerId;
use crate::body::Body;
use crate::charge::Release;
use crate::config::SessionConfig;
use crate::course::Course;
use crate::error::SetupError;
use crate::input::{InputAction, InputEvent, InputQueue};
use crate::lap::CheckpointOutcome;
use crate::motion::RespawnPoint;
use crate::player::Player;
use crate::sequencer::{Cue, Phase, PhaseTimings, RaceSequencer};
use crate::standings::{LeaderboardEntry, Standings, stroke_summary};

/// Fire-and-forget notifications for the host's display, audio, camera and
/// scene collaborators, in the order they happened.
#[derive(Clone, Debug, PartialEq)]
pub enum RaceEvent {
    PhaseChanged(Phase),
    CameraPriority(i32),
    CountdownVisible(bool),
    InputControl { player: PlayerId, enabled: bool },
    ChargeReleased { player: PlayerId, release: Release },
    StrokeAdded { player: PlayerId, strokes: u32 },
    Stunned { player: PlayerId, secs: f32 },
    CheckpointPassed { player: PlayerId, index: u32 },
    LapCompleted { player: PlayerId, lap: u32 },
    PlayerFinished { player: PlayerId, place: u32 },
    RaceComplete,
    Horn { player: PlayerId, sounding: bool },
    Respawned { player: PlayerId, secs: f32 },
    Summary(String),
    Leaderboard(Vec<LeaderboardEntry>),
    RestartRequested,
}

/// What a player's HUD shows this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerHud {
    pub player: PlayerId,
    pub charge_fill: f32,
    pub bar_visible: bool,
    pub stunned: bool,
    pub lap: u32,
    pub total_laps: u32,
    pub finished: bool,
    pub place: u32,
}

pub struct Session {
    config: SessionConfig,
    course: Course,
    players: Vec<Player>,
    standings: Standings,
    sequencer: RaceSequencer,
    input: InputQueue,
    events: Vec<RaceEvent>,
}

impl Session {
    /// Validate the setup and build a session sitting at the start of
    /// pre-race with every player locked.
    pub fn new(config: SessionConfig, course: Course) -> Result<Self, SetupError> {
        config.validate()?;
        if course.checkpoint_count() == 0 {
            return Err(SetupError::NoCheckpoints);
        }
        for player in config.active_players()? {
            let slot = player.player_id().slot().unwrap_or(usize::MAX);
            if slot >= course.grid.len() {
                return Err(SetupError::MissingSpawnPoint(player.id));
            }
        }
        let mut config = config;
        config.players.sort_by_key(|p| p.id);
        Ok(Self::build(config, course))
    }

    fn build(config: SessionConfig, course: Course) -> Self {
        let players: Vec<Player> = config
            .players
            .iter()
            .take(config.race.player_count)
            .enumerate()
            .map(|(slot, player)| {
                Player::new(
                    player.clone(),
                    config.tuning_for(player),
                    config.race.laps,
                    course.checkpoint_count(),
                    course.grid[slot],
                )
            })
            .collect();
        let standings = Standings::new(players.len());
        let sequencer = RaceSequencer::new(PhaseTimings::from(&config.race));

        let mut session = Self {
            config,
            course,
            players,
            standings,
            sequencer,
            input: InputQueue::default(),
            events: Vec::new(),
        };
        session.enter_pre_race();
        session
    }

    /// Throw away all race state and start again from pre-race, as the scene
    /// collaborator does on restart. Cars go back to the grid at rest with
    /// the drag they had before any slow zone.
    pub fn restart<B: Body>(&mut self, bodies: &mut [B]) {
        info!("session restart");
        for (player, body) in self.players.iter_mut().zip(bodies.iter_mut()) {
            player.leave_zones(body);
        }
        *self = Self::build(self.config.clone(), self.course.clone());
        for (point, body) in self.course.grid.iter().zip(bodies.iter_mut()) {
            body.teleport(point.position, point.forward);
            body.set_velocity(Vec2::ZERO);
            body.set_angular_velocity(0.0);
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    pub fn sequencer(&self) -> &RaceSequencer {
        &self.sequencer
    }

    pub fn standings(&self) -> &Standings {
        &self.standings
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        id.slot().and_then(|slot| self.players.get(slot))
    }

    pub fn is_race_complete(&self) -> bool {
        self.standings.is_race_complete()
    }

    /// Where each player's car starts, indexed by slot.
    pub fn starting_grid(&self) -> &[RespawnPoint] {
        &self.course.grid[..self.players.len()]
    }

    pub fn hud(&self, id: PlayerId) -> Option<PlayerHud> {
        let player = self.player(id)?;
        Some(PlayerHud {
            player: id,
            charge_fill: player.charge().charge_amount(),
            bar_visible: player.charge().bar_visible(),
            stunned: player.charge().is_effectively_stunned(),
            lap: player.laps().lap(),
            total_laps: player.laps().total_laps(),
            finished: player.is_finished(),
            place: player.finish_rank(),
        })
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Frame tick: queued input, per-player timers, then the sequencer, so it
    /// sees every finish that happened up to now.
    pub fn update<B: Body>(&mut self, dt: f32, bodies: &mut [B]) {
        let queued: Vec<InputEvent> = self.input.drain().collect();
        for event in queued {
            self.handle_input(event, bodies);
        }

        for player in &mut self.players {
            player.update(dt);
        }

        for cue in self.sequencer.tick(dt, self.standings.is_race_complete()) {
            self.handle_cue(cue, bodies);
        }
    }

    /// Fixed physics tick: stun, slow zones and motion for every player,
    /// then checkpoint gates against where each car moved.
    pub fn physics_tick<B: Body>(&mut self, dt: f32, bodies: &mut [B]) {
        for slot in 0..self.players.len() {
            let Some(body) = bodies.get_mut(slot) else {
                continue;
            };
            let player = &mut self.players[slot];
            let id = player.id();
            let outcome = player.physics_tick(body, &self.course.slow_zones, dt);
            if let Some(secs) = outcome.stunned {
                self.events.push(RaceEvent::Stunned { player: id, secs });
            }
            if let Some(release) = outcome.interrupted {
                self.record_release(id, release);
            }
        }

        for slot in 0..self.players.len() {
            let Some(body) = bodies.get_mut(slot) else {
                continue;
            };
            let now = body.position();
            let Some(before) = self.players[slot].take_last_position(now) else {
                continue;
            };
            self.check_gates(PlayerId::from_slot(slot), before, now, body);
        }
    }

    fn check_gates(&mut self, id: PlayerId, before: Vec2, now: Vec2, body: &mut dyn Body) {
        let crossed: Vec<(u32, RespawnPoint)> = self
            .course
            .gates
            .iter()
            .filter(|gate| gate.crossed(before, now))
            .map(|gate| (gate.index, gate.respawn_point()))
            .collect();
        for (index, point) in crossed {
            self.passed_respawn_checkpoint(id, point);
            self.passed_checkpoint(id, index, body);
        }
    }

    /// Trigger collaborator entry point: `id`'s car entered checkpoint `index`.
    pub fn passed_checkpoint(
        &mut self,
        id: PlayerId,
        index: u32,
        body: &mut dyn Body,
    ) -> CheckpointOutcome {
        let Some(player) = id.slot().and_then(|slot| self.players.get_mut(slot)) else {
            return CheckpointOutcome::Ignored;
        };
        let (outcome, release) = player.passed_checkpoint(index, body);
        if let Some(release) = release {
            self.record_release(id, release);
        }

        match outcome {
            CheckpointOutcome::Ignored => {}
            CheckpointOutcome::Advanced { checkpoint } => {
                debug!(%id, checkpoint, "checkpoint passed");
                self.events.push(RaceEvent::CheckpointPassed {
                    player: id,
                    index: checkpoint,
                });
            }
            CheckpointOutcome::LapCompleted { lap } => {
                self.events.push(RaceEvent::CheckpointPassed { player: id, index });
                self.events.push(RaceEvent::LapCompleted { player: id, lap });
            }
            CheckpointOutcome::Finished => {
                self.events.push(RaceEvent::CheckpointPassed { player: id, index });
                self.events.push(RaceEvent::InputControl {
                    player: id,
                    enabled: false,
                });
                self.player_finished(id);
            }
        }
        outcome
    }

    pub fn passed_respawn_checkpoint(&mut self, id: PlayerId, point: RespawnPoint) {
        if let Some(player) = id.slot().and_then(|slot| self.players.get_mut(slot)) {
            player.passed_respawn_checkpoint(point);
        }
    }

    /// Record `id` as finished. Returns its place.
    pub fn player_finished(&mut self, id: PlayerId) -> Option<u32> {
        let was_complete = self.standings.is_race_complete();
        let place = self.standings.player_finished(id)?;
        if let Some(player) = id.slot().and_then(|slot| self.players.get_mut(slot)) {
            player.set_finish_rank(place);
        }
        self.events.push(RaceEvent::PlayerFinished { player: id, place });
        if !was_complete && self.standings.is_race_complete() {
            self.events.push(RaceEvent::RaceComplete);
        }
        Some(place)
    }

    pub fn set_input_control(&mut self, id: PlayerId, enabled: bool, body: &mut dyn Body) {
        let Some(player) = id.slot().and_then(|slot| self.players.get_mut(slot)) else {
            return;
        };
        let release = player.set_input_control(enabled, body);
        self.events.push(RaceEvent::InputControl {
            player: id,
            enabled,
        });
        if let Some(release) = release {
            self.record_release(id, release);
        }
    }

    /// Put `id`'s car back at its last respawn checkpoint. Returns how long
    /// the respawn lasts.
    pub fn respawn(&mut self, id: PlayerId, body: &mut dyn Body) -> Option<f32> {
        let player = id.slot().and_then(|slot| self.players.get_mut(slot))?;
        let secs = player.respawn(body);
        self.events.push(RaceEvent::Respawned { player: id, secs });
        Some(secs)
    }

    fn handle_input<B: Body>(&mut self, event: InputEvent, bodies: &mut [B]) {
        let Some(slot) = event.player.slot().filter(|&s| s < self.players.len()) else {
            trace!(player = %event.player, "input for unknown player dropped");
            return;
        };
        let Some(body) = bodies.get_mut(slot) else {
            trace!(player = %event.player, "input for player without a body dropped");
            return;
        };
        let player = &mut self.players[slot];
        if let InputAction::Steer(raw) = event.action {
            player.steer(raw);
            return;
        }
        if !player.input_enabled() {
            return;
        }

        let id = event.player;
        match event.action {
            InputAction::ChargePressed => {
                player.begin_charge(body);
            }
            InputAction::ChargeReleased => {
                if let Some(release) = player.end_charge(body) {
                    self.record_release(id, release);
                }
            }
            InputAction::HornPressed | InputAction::HornReleased => {
                let sounding = event.action == InputAction::HornPressed;
                if player.set_horn(sounding) {
                    self.events.push(RaceEvent::Horn {
                        player: id,
                        sounding,
                    });
                }
            }
            InputAction::Steer(_) => {}
            InputAction::RespawnRequested => {
                self.respawn(id, body);
            }
        }
    }

    /// Every release is a stroke, forced or not.
    fn record_release(&mut self, id: PlayerId, release: Release) {
        self.events.push(RaceEvent::ChargeReleased {
            player: id,
            release,
        });
        self.standings.add_stroke(id);
        self.events.push(RaceEvent::StrokeAdded {
            player: id,
            strokes: self.standings.strokes(id),
        });
    }

    fn handle_cue<B: Body>(&mut self, cue: Cue, bodies: &mut [B]) {
        match cue {
            Cue::Enter(Phase::PreRace) => self.enter_pre_race(),
            Cue::Enter(Phase::Countdown) => self.enter_countdown(),
            Cue::Enter(Phase::InRace) => self.enter_in_race(bodies),
            Cue::Enter(Phase::PostRace) => self.enter_post_race(bodies),
            Cue::HideCountdown => self.events.push(RaceEvent::CountdownVisible(false)),
            Cue::Restart => self.events.push(RaceEvent::RestartRequested),
        }
    }

    fn enter_pre_race(&mut self) {
        self.events.push(RaceEvent::PhaseChanged(Phase::PreRace));
        for player in &mut self.players {
            player.lock_idle();
            self.events.push(RaceEvent::InputControl {
                player: player.id(),
                enabled: false,
            });
        }
    }

    fn enter_countdown(&mut self) {
        self.events.push(RaceEvent::CameraPriority(
            self.config.race.intro_camera_priority,
        ));
        self.events.push(RaceEvent::PhaseChanged(Phase::Countdown));
        self.events.push(RaceEvent::CountdownVisible(true));
    }

    fn enter_in_race<B: Body>(&mut self, bodies: &mut [B]) {
        self.events.push(RaceEvent::PhaseChanged(Phase::InRace));
        self.set_all_input_control(true, bodies);
    }

    fn enter_post_race<B: Body>(&mut self, bodies: &mut [B]) {
        if self.players.len() == 1 {
            let strokes = self.standings.strokes(PlayerId(1));
            self.events.push(RaceEvent::Summary(stroke_summary(strokes)));
        } else {
            let board = self.standings.leaderboard(self.config.race.position_weight);
            for entry in &board {
                info!("{entry}");
            }
            self.events.push(RaceEvent::Leaderboard(board));
        }
        self.standings.reset_strokes();
        self.events.push(RaceEvent::PhaseChanged(Phase::PostRace));
        self.set_all_input_control(false, bodies);
    }

    fn set_all_input_control<B: Body>(&mut self, enabled: bool, bodies: &mut [B]) {
        for slot in 0..self.players.len() {
            let id = PlayerId::from_slot(slot);
            match bodies.get_mut(slot) {
                Some(body) => self.set_input_control(id, enabled, body),
                None => {
                    if !enabled {
                        self.players[slot].lock_idle();
                    }
                }
            }
        }
    }
}
