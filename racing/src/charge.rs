//! Charge-and-release propulsion.
//!
//! Holding charge sweeps a bar up and down between empty and full. Releasing
//! fires the car forward with an impulse that grows with the bar (plus a
//! bonus for holding near the top) and starts a cooldown proportional to the
//! charge spent. While charging the car spins on the spot instead of driving.

use tracing::{debug, trace};

use crate::body::Body;
use crate::config::ChargeTuning;
use crate::input::apply_deadzone;
use crate::motion::MotionController;

/// Timers at or below this count as expired.
pub const EPSILON: f32 = 0.001;
/// Upper bound for the stunned and stun-immunity timers.
pub const MAX_STUN_TIMER: f32 = 5.0;
/// Stun immunity granted by a release, so the release itself cannot stun.
pub const RELEASE_IMMUNITY_SECS: f32 = 0.1;
/// `turning_sensitivity` is degrees per step at this rate.
pub const SPIN_REFERENCE_HZ: f32 = 50.0;
/// Upper bound of the long-charge bonus.
pub const MAX_BONUS: f32 = 999.0;

const TOP: f32 = 0.999;
const BOTTOM: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChargePhase {
    Idle,
    ChargingUp,
    ChargingDown,
    CoolingDown,
    Stunned,
}

/// What a release produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Release {
    pub charge: f32,
    pub bonus: f32,
    pub impulse: f32,
    pub cooldown: f32,
}

#[derive(Clone, Debug)]
pub struct ChargeMachine {
    tuning: ChargeTuning,
    charge_amount: f32,
    normalized_time: f32,
    charging: bool,
    charging_up: bool,
    accel_amount: f32,
    steering: f32,
    cooldown: f32,
    stunned: f32,
    immunity: f32,
}

impl ChargeMachine {
    pub fn new(tuning: ChargeTuning) -> Self {
        Self {
            tuning,
            charge_amount: 0.0,
            normalized_time: 0.0,
            charging: false,
            charging_up: true,
            accel_amount: 0.0,
            steering: 0.0,
            cooldown: 0.0,
            stunned: 0.0,
            immunity: 0.0,
        }
    }

    pub fn tuning(&self) -> &ChargeTuning {
        &self.tuning
    }

    pub fn charge_amount(&self) -> f32 {
        self.charge_amount
    }

    pub fn normalized_time(&self) -> f32 {
        self.normalized_time
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    pub fn is_charging_up(&self) -> bool {
        self.charging_up
    }

    pub fn accel_amount(&self) -> f32 {
        self.accel_amount
    }

    pub fn steering(&self) -> f32 {
        self.steering
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn stunned_timer(&self) -> f32 {
        self.stunned
    }

    pub fn immunity_timer(&self) -> f32 {
        self.immunity
    }

    pub fn is_immune(&self) -> bool {
        self.immunity > EPSILON
    }

    pub fn is_effectively_stunned(&self) -> bool {
        self.stunned > EPSILON && !self.is_immune()
    }

    /// The charge bar is hidden while cooling down.
    pub fn bar_visible(&self) -> bool {
        self.cooldown <= EPSILON
    }

    pub fn phase(&self) -> ChargePhase {
        if self.charging {
            if self.charging_up {
                ChargePhase::ChargingUp
            } else {
                ChargePhase::ChargingDown
            }
        } else if self.is_effectively_stunned() {
            ChargePhase::Stunned
        } else if self.cooldown > EPSILON {
            ChargePhase::CoolingDown
        } else {
            ChargePhase::Idle
        }
    }

    /// Start charging. Returns `false` if the press was declined.
    pub fn begin(&mut self, motion: &mut MotionController, body: &mut dyn Body) -> bool {
        if self.charging {
            trace!("charge press ignored: already charging");
            return false;
        }
        if self.cooldown > EPSILON {
            trace!(cooldown = self.cooldown, "charge press ignored: cooling down");
            return false;
        }
        if !body.is_grounded() {
            trace!("charge press ignored: airborne");
            return false;
        }
        if self.is_effectively_stunned() {
            trace!(stunned = self.stunned, "charge press ignored: stunned");
            return false;
        }

        motion.stop_all_wheels(body);
        motion.set_wheel_friction(false);
        motion.set_steerable(false);
        self.charging = true;
        self.charging_up = true;
        self.charge_amount = 0.0;
        self.normalized_time = 0.0;
        true
    }

    /// Release the charge and fire the car forward.
    pub fn end(&mut self, motion: &mut MotionController, body: &mut dyn Body) -> Option<Release> {
        if !self.charging {
            return None;
        }

        self.charging = false;
        motion.set_steerable(true);
        motion.set_wheel_friction(true);

        let charge = self.charge_amount;
        self.accel_amount = charge.clamp(0.0, 1.0);
        self.cooldown = self.tuning.charge_cooldown * charge;
        self.immunity = RELEASE_IMMUNITY_SECS;

        let bonus = self
            .tuning
            .bonus_curve
            .evaluate(self.normalized_time)
            .clamp(0.0, MAX_BONUS);
        let impulse = self.tuning.release_impulse * (charge + bonus);
        motion.apply_forward_impulse(body, impulse);

        self.charge_amount = 0.0;
        debug!(charge, bonus, impulse, cooldown = self.cooldown, "charge released");

        Some(Release {
            charge,
            bonus,
            impulse,
            cooldown: self.cooldown,
        })
    }

    /// Set the stunned timer.
    pub fn stun(&mut self, secs: f32) {
        self.stunned = secs.max(0.0);
    }

    pub fn set_steering(&mut self, raw: f32) {
        self.steering = if self.is_effectively_stunned() {
            0.0
        } else {
            apply_deadzone(raw)
        };
    }

    pub fn clear_steering(&mut self) {
        self.steering = 0.0;
    }

    /// Frame update: timers, acceleration decay and the charge sweep.
    pub fn update(&mut self, dt: f32) {
        self.accel_amount =
            (self.accel_amount - dt / self.tuning.accel_decay_time).clamp(0.0, 1.0);

        self.cooldown = (self.cooldown - dt).clamp(0.0, self.tuning.charge_cooldown.max(0.0));
        self.stunned = (self.stunned - dt).clamp(0.0, MAX_STUN_TIMER);
        self.immunity = (self.immunity - dt).clamp(0.0, MAX_STUN_TIMER);

        if self.is_effectively_stunned() {
            self.steering = 0.0;
        }

        if !self.charging {
            return;
        }

        let delta = dt / self.tuning.charge_time;
        if self.charging_up {
            self.normalized_time = (self.normalized_time + delta).clamp(0.0, 1.0);
            if self.normalized_time > TOP {
                self.charging_up = false;
            }
        } else {
            self.normalized_time = (self.normalized_time - delta).clamp(0.0, 1.0);
            if self.normalized_time < BOTTOM {
                self.charging_up = true;
            }
        }
        self.charge_amount = self
            .tuning
            .charge_curve
            .evaluate(self.normalized_time)
            .clamp(0.0, 1.0);
    }

    /// Physics tick: spin in place while charging, drive otherwise.
    pub fn apply_motion(&self, motion: &mut MotionController, body: &mut dyn Body, dt: f32) {
        if self.charging {
            let degrees =
                self.steering * self.tuning.turning_sensitivity * SPIN_REFERENCE_HZ * dt;
            motion.rotate_in_place(body, degrees);
            motion.drive(body, 0.0, self.accel_amount, dt);
        } else {
            motion.drive(body, self.steering, self.accel_amount, dt);
        }
    }
}
