use bevy::math::Vec2;
use tracing::debug;

use crate::body::Body;
use crate::config::MotionTuning;

/// Where a car is put back on the track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RespawnPoint {
    pub position: Vec2,
    pub forward: Vec2,
}

impl RespawnPoint {
    pub fn new(position: Vec2, forward: Vec2) -> Self {
        Self {
            position,
            forward: forward.normalize_or(Vec2::Y),
        }
    }
}

/// Turns normalized steer/throttle into forces on the car body and owns the
/// wheel state (grip, steering lock, respawn).
#[derive(Clone, Debug)]
pub struct MotionController {
    tuning: MotionTuning,
    can_steer: bool,
    wheel_friction: bool,
    respawn_timer: f32,
}

impl MotionController {
    pub fn new(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            can_steer: true,
            wheel_friction: true,
            respawn_timer: 0.0,
        }
    }

    pub fn tuning(&self) -> &MotionTuning {
        &self.tuning
    }

    pub fn can_steer(&self) -> bool {
        self.can_steer
    }

    pub fn set_steerable(&mut self, can_steer: bool) {
        self.can_steer = can_steer;
    }

    pub fn has_wheel_friction(&self) -> bool {
        self.wheel_friction
    }

    pub fn set_wheel_friction(&mut self, enabled: bool) {
        self.wheel_friction = enabled;
    }

    pub fn is_respawning(&self) -> bool {
        self.respawn_timer > 0.0
    }

    pub fn stop_all_wheels(&mut self, body: &mut dyn Body) {
        body.set_angular_velocity(0.0);
    }

    /// Drive for one physics tick. `steer` is in [-1, 1] with positive
    /// turning right; `throttle` is in [0, 1].
    pub fn drive(&mut self, body: &mut dyn Body, steer: f32, throttle: f32, dt: f32) {
        if self.is_respawning() {
            return;
        }

        let forward = body.forward();
        let throttle = throttle.clamp(0.0, 1.0);
        if throttle > 0.0 {
            body.apply_force(forward * throttle * self.tuning.motor_force);
        }

        if self.can_steer {
            let speed = body.velocity().dot(forward);
            let authority = (speed.abs() / self.tuning.turn_speed.max(f32::EPSILON)).min(1.0);
            let yaw = -steer.clamp(-1.0, 1.0) * self.tuning.max_turn_rate * authority;
            body.set_angular_velocity(yaw * speed.signum());
        }

        if self.wheel_friction {
            let left = forward.perp();
            let velocity = body.velocity();
            let lateral = velocity.dot(left);
            let bleed = (self.tuning.lateral_grip * dt).clamp(0.0, 1.0);
            body.set_velocity(velocity - left * lateral * bleed);
        }
    }

    /// Spin the car on the spot, positive `degrees` turning right.
    pub fn rotate_in_place(&mut self, body: &mut dyn Body, degrees: f32) {
        if degrees != 0.0 {
            body.rotate(-degrees.to_radians());
        }
    }

    pub fn apply_forward_impulse(&mut self, body: &mut dyn Body, amount: f32) {
        let forward = body.forward();
        body.apply_impulse(forward * amount);
    }

    /// Put the car back at `point` at rest. Returns how long the car stays
    /// in the respawning state.
    pub fn respawn(&mut self, body: &mut dyn Body, point: RespawnPoint) -> f32 {
        body.teleport(point.position, point.forward);
        body.set_velocity(Vec2::ZERO);
        body.set_angular_velocity(0.0);
        self.respawn_timer = self.tuning.respawn_secs;
        debug!(x = point.position.x, y = point.position.y, "car respawned");
        self.respawn_timer
    }

    pub fn tick(&mut self, dt: f32) {
        self.respawn_timer = (self.respawn_timer - dt).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::test_body::TestBody;

    fn controller() -> MotionController {
        MotionController::new(MotionTuning::default())
    }

    #[test]
    fn drive_pushes_along_forward_scaled_by_throttle() {
        let mut motion = controller();
        let mut body = TestBody::default();
        motion.drive(&mut body, 0.0, 0.5, 0.01);

        let force = body.forces[0];
        assert!(force.x.abs() < 1e-6);
        assert!((force.y - 0.5 * MotionTuning::default().motor_force).abs() < 1e-3);
    }

    #[test]
    fn zero_throttle_applies_no_force() {
        let mut motion = controller();
        let mut body = TestBody::default();
        motion.drive(&mut body, 1.0, 0.0, 0.01);
        assert!(body.forces.is_empty());
    }

    #[test]
    fn steering_right_turns_clockwise_when_moving_forward() {
        let mut motion = controller();
        let mut body = TestBody::moving(10.0);
        motion.drive(&mut body, 1.0, 0.0, 0.01);
        assert!(body.angular_velocity < 0.0);
    }

    #[test]
    fn locked_steering_leaves_spin_alone() {
        let mut motion = controller();
        motion.set_steerable(false);
        let mut body = TestBody::moving(10.0);
        body.angular_velocity = 0.7;
        motion.drive(&mut body, 1.0, 0.0, 0.01);
        assert_eq!(body.angular_velocity, 0.7);
    }

    #[test]
    fn friction_bleeds_sideways_velocity_only_when_enabled() {
        let mut motion = controller();
        let mut body = TestBody {
            velocity: Vec2::new(4.0, 2.0),
            ..Default::default()
        };
        motion.drive(&mut body, 0.0, 0.0, 0.01);
        assert!(body.velocity.x.abs() < 4.0);
        assert_eq!(body.velocity.y, 2.0);

        motion.set_wheel_friction(false);
        let before = body.velocity;
        motion.drive(&mut body, 0.0, 0.0, 0.01);
        assert_eq!(body.velocity, before);
    }

    #[test]
    fn respawn_moves_and_stops_the_car_then_times_out() {
        let mut motion = controller();
        let mut body = TestBody::moving(12.0);
        let point = RespawnPoint::new(Vec2::new(5.0, 3.0), Vec2::X);

        let secs = motion.respawn(&mut body, point);
        assert_eq!(secs, MotionTuning::default().respawn_secs);
        assert_eq!(body.position, Vec2::new(5.0, 3.0));
        assert_eq!(body.forward, Vec2::X);
        assert_eq!(body.velocity, Vec2::ZERO);
        assert!(motion.is_respawning());

        motion.drive(&mut body, 0.0, 1.0, 0.01);
        assert!(body.forces.is_empty());

        motion.tick(secs + 0.1);
        assert!(!motion.is_respawning());
    }

    #[test]
    fn rotate_in_place_turns_right_for_positive_degrees() {
        let mut motion = controller();
        let mut body = TestBody::default();
        motion.rotate_in_place(&mut body, 90.0);
        assert!((body.forward - Vec2::X).length() < 1e-5);
    }
}
