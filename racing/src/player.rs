use bevy::math::Vec2;
use tracing::trace;

use crate::PlayerId;
use crate::body::Body;
use crate::charge::{ChargeMachine, Release};
use crate::config::{PlayerConfig, PlayerTuning};
use crate::course::{SlowZone, ZoneTracker};
use crate::lap::{CheckpointOutcome, LapTracker};
use crate::motion::{MotionController, RespawnPoint};
use crate::stun::StunMonitor;

/// What one physics tick did to a player.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicsOutcome {
    /// Stun applied this tick.
    pub stunned: Option<f32>,
    /// Charge cut short by the stun.
    pub interrupted: Option<Release>,
}

/// One racer: charge machine, motion controller, stun monitor and lap
/// tracker, plus the per-player config they were built from.
#[derive(Clone, Debug)]
pub struct Player {
    id: PlayerId,
    config: PlayerConfig,
    charge: ChargeMachine,
    motion: MotionController,
    stun: StunMonitor,
    laps: LapTracker,
    zones: ZoneTracker,
    input_enabled: bool,
    /// Steering axis as last reported by the host, applied every update.
    held_steer: f32,
    horn: bool,
    respawn_point: RespawnPoint,
    last_position: Option<Vec2>,
    finish_rank: u32,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        tuning: &PlayerTuning,
        total_laps: u32,
        checkpoint_count: u32,
        start: RespawnPoint,
    ) -> Self {
        Self {
            id: config.player_id(),
            config,
            charge: ChargeMachine::new(tuning.charge.clone()),
            motion: MotionController::new(tuning.motion.clone()),
            stun: StunMonitor::default(),
            laps: LapTracker::new(total_laps, checkpoint_count),
            zones: ZoneTracker::default(),
            input_enabled: false,
            held_steer: 0.0,
            horn: false,
            respawn_point: start,
            last_position: None,
            finish_rank: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn charge(&self) -> &ChargeMachine {
        &self.charge
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub fn laps(&self) -> &LapTracker {
        &self.laps
    }

    pub fn last_speed(&self) -> f32 {
        self.stun.last_speed()
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn horn_sounding(&self) -> bool {
        self.horn
    }

    pub fn respawn_point(&self) -> RespawnPoint {
        self.respawn_point
    }

    pub fn is_finished(&self) -> bool {
        self.laps.is_finished()
    }

    pub fn is_respawning(&self) -> bool {
        self.motion.is_respawning()
    }

    /// Finishing place, 0 until the player finishes.
    pub fn finish_rank(&self) -> u32 {
        self.finish_rank
    }

    pub(crate) fn set_finish_rank(&mut self, rank: u32) {
        self.finish_rank = rank;
    }

    pub fn begin_charge(&mut self, body: &mut dyn Body) -> bool {
        self.charge.begin(&mut self.motion, body)
    }

    pub fn end_charge(&mut self, body: &mut dyn Body) -> Option<Release> {
        self.charge.end(&mut self.motion, body)
    }

    /// Record the raw steering axis. It is kept while control is disabled
    /// or the player is stunned and takes effect once neither holds.
    pub fn steer(&mut self, raw: f32) {
        self.held_steer = raw;
        if self.input_enabled {
            self.charge.set_steering(raw);
        }
    }

    pub fn held_steer(&self) -> f32 {
        self.held_steer
    }

    /// Returns `true` if the horn state changed.
    pub fn set_horn(&mut self, sounding: bool) -> bool {
        let changed = self.horn != sounding;
        self.horn = sounding;
        changed
    }

    /// Enable or disable control. Disabling drops steering, silences the horn
    /// and releases any charge in progress, which is returned.
    pub fn set_input_control(&mut self, enabled: bool, body: &mut dyn Body) -> Option<Release> {
        self.input_enabled = enabled;
        if enabled {
            return None;
        }
        self.charge.clear_steering();
        self.horn = false;
        if self.charge.is_charging() {
            self.end_charge(body)
        } else {
            None
        }
    }

    /// Disable control for a player that cannot be charging yet.
    pub(crate) fn lock_idle(&mut self) {
        debug_assert!(!self.charge.is_charging());
        self.input_enabled = false;
        self.charge.clear_steering();
        self.horn = false;
    }

    pub fn respawn(&mut self, body: &mut dyn Body) -> f32 {
        let secs = self.motion.respawn(body, self.respawn_point);
        self.stun.reset(0.0);
        self.last_position = Some(self.respawn_point.position);
        secs
    }

    pub fn passed_respawn_checkpoint(&mut self, point: RespawnPoint) {
        if self.is_finished() {
            trace!(player = %self.id, "respawn checkpoint ignored: finished");
            return;
        }
        self.respawn_point = point;
    }

    /// Report a checkpoint. On finishing, control is disabled and any charge
    /// in progress is released; the release is returned alongside.
    pub fn passed_checkpoint(
        &mut self,
        index: u32,
        body: &mut dyn Body,
    ) -> (CheckpointOutcome, Option<Release>) {
        let outcome = self.laps.passed_checkpoint(index);
        let release = match outcome {
            CheckpointOutcome::Finished => self.set_input_control(false, body),
            _ => None,
        };
        (outcome, release)
    }

    /// Frame update.
    pub fn update(&mut self, dt: f32) {
        self.charge.update(dt);
        if self.input_enabled {
            self.charge.set_steering(self.held_steer);
        }
        self.motion.tick(dt);
    }

    /// Physics tick: stun detection first, so a forced release is already
    /// reflected in this tick's motion.
    pub fn physics_tick(
        &mut self,
        body: &mut dyn Body,
        zones: &[SlowZone],
        dt: f32,
    ) -> PhysicsOutcome {
        let mut outcome = PhysicsOutcome::default();

        let speed = body.velocity_magnitude();
        if let Some(secs) = self.stun.observe(speed, self.charge.is_immune()) {
            self.charge.stun(secs);
            outcome.stunned = Some(secs);
            if self.charge.is_charging() {
                outcome.interrupted = self.end_charge(body);
            }
        }

        self.zones.update(zones, body);
        self.charge.apply_motion(&mut self.motion, body, dt);
        outcome
    }

    /// Give the body back the drag it had before entering a slow zone.
    pub(crate) fn leave_zones(&mut self, body: &mut dyn Body) {
        self.zones.leave(body);
    }

    /// Position at the end of the previous physics tick, for gate detection.
    pub(crate) fn take_last_position(&mut self, now: Vec2) -> Option<Vec2> {
        self.last_position.replace(now)
    }

    pub fn apply_impulse(&self, body: &mut dyn Body, impulse: Vec2) {
        body.apply_impulse(impulse);
    }

    pub fn apply_force(&self, body: &mut dyn Body, force: Vec2) {
        body.apply_force(force);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::test_body::TestBody;
    use crate::config::SessionConfig;

    fn player(laps: u32, checkpoints: u32) -> Player {
        let config = SessionConfig::default();
        Player::new(
            config.players[0].clone(),
            &config.tuning,
            laps,
            checkpoints,
            RespawnPoint::new(Vec2::ZERO, Vec2::Y),
        )
    }

    #[test]
    fn new_players_start_locked_on_lap_one() {
        let p = player(3, 4);
        assert_eq!(p.id(), PlayerId(1));
        assert!(!p.input_enabled());
        assert_eq!(p.laps().lap(), 1);
        assert_eq!(p.laps().last_checkpoint(), 0);
        assert_eq!(p.finish_rank(), 0);
    }

    #[test]
    fn collision_while_charging_stuns_and_releases() {
        let mut p = player(3, 4);
        let mut body = TestBody::moving(30.0);
        p.physics_tick(&mut body, &[], 0.005);
        assert!(p.begin_charge(&mut body));

        body.velocity = Vec2::ZERO;
        let outcome = p.physics_tick(&mut body, &[], 0.005);
        assert!(outcome.stunned.is_some());
        assert!(outcome.interrupted.is_some());
        assert!(!p.charge().is_charging());
        assert!(p.motion().can_steer());
    }

    #[test]
    fn stun_is_skipped_while_immune_after_a_release() {
        let mut p = player(3, 4);
        let mut body = TestBody::moving(30.0);
        p.physics_tick(&mut body, &[], 0.005);
        p.begin_charge(&mut body);
        p.end_charge(&mut body);

        body.velocity = Vec2::ZERO;
        let outcome = p.physics_tick(&mut body, &[], 0.005);
        assert_eq!(outcome.stunned, None);
    }

    #[test]
    fn disabling_input_releases_the_charge_and_clears_steering() {
        let mut p = player(3, 4);
        let mut body = TestBody::default();
        p.set_input_control(true, &mut body);
        p.steer(1.0);
        p.set_horn(true);
        p.begin_charge(&mut body);
        p.update(0.3);

        let release = p.set_input_control(false, &mut body).unwrap();
        assert!((release.charge - 0.3).abs() < 1e-5);
        assert!(!p.input_enabled());
        assert_eq!(p.charge().steering(), 0.0);
        assert!(!p.horn_sounding());
    }

    #[test]
    fn held_steering_returns_after_a_stun() {
        let mut p = player(3, 4);
        let mut body = TestBody::default();
        p.set_input_control(true, &mut body);
        p.steer(1.0);
        p.charge.stun(0.5);
        p.update(0.1);
        assert_eq!(p.charge().steering(), 0.0);

        p.update(0.5);
        assert_eq!(p.charge().steering(), 1.0);
    }

    #[test]
    fn steering_held_while_locked_applies_once_enabled() {
        let mut p = player(3, 4);
        let mut body = TestBody::default();
        p.steer(-1.0);
        p.update(0.1);
        assert_eq!(p.charge().steering(), 0.0);

        p.set_input_control(true, &mut body);
        p.update(0.1);
        assert_eq!(p.charge().steering(), -1.0);
    }

    #[test]
    fn finishing_locks_the_player_and_freezes_the_tracker() {
        let mut p = player(1, 2);
        let mut body = TestBody::default();
        p.set_input_control(true, &mut body);

        assert_eq!(
            p.passed_checkpoint(1, &mut body).0,
            CheckpointOutcome::Advanced { checkpoint: 1 }
        );
        assert_eq!(
            p.passed_checkpoint(2, &mut body).0,
            CheckpointOutcome::Finished
        );
        assert!(p.is_finished());
        assert!(!p.input_enabled());
        assert_eq!(p.passed_checkpoint(1, &mut body).0, CheckpointOutcome::Ignored);
    }

    #[test]
    fn respawn_returns_to_the_last_respawn_checkpoint_without_stunning() {
        let mut p = player(3, 4);
        let mut body = TestBody::moving(40.0);
        p.physics_tick(&mut body, &[], 0.005);

        let point = RespawnPoint::new(Vec2::new(7.0, 7.0), Vec2::X);
        p.passed_respawn_checkpoint(point);
        let secs = p.respawn(&mut body);
        assert!(secs > 0.0);
        assert_eq!(body.position, Vec2::new(7.0, 7.0));
        assert!(p.is_respawning());

        let outcome = p.physics_tick(&mut body, &[], 0.005);
        assert_eq!(outcome.stunned, None);
    }
}
