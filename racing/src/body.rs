use bevy::math::Vec2;

/// The rigid body a player drives, as seen by the gameplay core.
///
/// The host implements this over its physics engine. Forces are integrated by
/// the host; impulses change velocity immediately.
pub trait Body {
    fn position(&self) -> Vec2;

    /// Unit vector the car's nose points along.
    fn forward(&self) -> Vec2;

    fn velocity(&self) -> Vec2;

    fn set_velocity(&mut self, velocity: Vec2);

    fn velocity_magnitude(&self) -> f32 {
        self.velocity().length()
    }

    fn set_angular_velocity(&mut self, radians_per_sec: f32);

    fn apply_impulse(&mut self, impulse: Vec2);

    fn apply_force(&mut self, force: Vec2);

    /// Turn the body in place, counter-clockwise positive.
    fn rotate(&mut self, radians: f32);

    fn is_grounded(&self) -> bool;

    /// Move the body to `position` facing `forward`, keeping its velocity.
    fn teleport(&mut self, position: Vec2, forward: Vec2);

    /// Linear drag coefficient.
    fn drag(&self) -> f32;

    fn set_drag(&mut self, drag: f32);
}
