//! Stun from sudden speed loss.
//!
//! Each physics tick the monitor compares the body's speed against the
//! previous tick. A large drop (a collision, usually) stuns the player for a
//! time that grows with the size of the drop.

use tracing::debug;

/// Speed loss per tick below which nothing happens.
pub const STUN_THRESHOLD: f32 = 10.0;
/// Speed loss at which the stun duration stops interpolating.
pub const STUN_CEILING: f32 = 30.0;
/// Stun applied to any loss at or above the ceiling.
pub const MAX_STUN_SECS: f32 = 30.0;
pub const MIN_INTERPOLATED_STUN_SECS: f32 = 0.5;
pub const MAX_INTERPOLATED_STUN_SECS: f32 = 2.0;

/// Stun duration in seconds for a given per-tick speed loss.
pub fn stun_duration(delta_speed: f32) -> f32 {
    if delta_speed <= STUN_THRESHOLD {
        0.0
    } else if delta_speed >= STUN_CEILING {
        MAX_STUN_SECS
    } else {
        let t = (delta_speed - STUN_THRESHOLD) / (STUN_CEILING - STUN_THRESHOLD);
        MIN_INTERPOLATED_STUN_SECS
            + (MAX_INTERPOLATED_STUN_SECS - MIN_INTERPOLATED_STUN_SECS) * t
    }
}

#[derive(Clone, Debug, Default)]
pub struct StunMonitor {
    last_speed: f32,
}

impl StunMonitor {
    pub fn last_speed(&self) -> f32 {
        self.last_speed
    }

    /// Forget the previous speed, so a teleport or reset cannot read as a
    /// collision on the next tick.
    pub fn reset(&mut self, speed: f32) {
        self.last_speed = speed.max(0.0);
    }

    /// Observe this tick's speed. Returns the stun to apply, if any.
    pub fn observe(&mut self, speed: f32, immune: bool) -> Option<f32> {
        let delta_speed = self.last_speed - speed;
        self.last_speed = speed.max(0.0);

        if immune || delta_speed <= STUN_THRESHOLD {
            return None;
        }

        let duration = stun_duration(delta_speed);
        debug!(delta_speed, duration, "collision stun");
        Some(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_losses_do_not_stun() {
        for delta in [0.0, 2.5, 9.99, 10.0] {
            assert_eq!(stun_duration(delta), 0.0, "delta {delta}");
        }
        assert_eq!(stun_duration(-50.0), 0.0);
    }

    #[test]
    fn large_losses_hit_the_cap() {
        assert_eq!(stun_duration(30.0), MAX_STUN_SECS);
        assert_eq!(stun_duration(30.01), MAX_STUN_SECS);
        assert_eq!(stun_duration(120.0), MAX_STUN_SECS);
    }

    #[test]
    fn mid_range_interpolates_linearly() {
        assert!((stun_duration(20.0) - 1.25).abs() < 1e-6);
        assert!((stun_duration(29.9) - 1.9925).abs() < 1e-4);
        assert!((stun_duration(10.5) - 0.5375).abs() < 1e-6);
    }

    #[test]
    fn monitor_stuns_on_a_sudden_stop() {
        let mut monitor = StunMonitor::default();
        assert_eq!(monitor.observe(25.0, false), None);
        let stun = monitor.observe(5.0, false).unwrap();
        assert!((stun - 1.25).abs() < 1e-6);
        assert_eq!(monitor.last_speed(), 5.0);
    }

    #[test]
    fn monitor_boundaries() {
        let mut monitor = StunMonitor::default();
        monitor.observe(10.0, false);
        assert_eq!(monitor.observe(0.0, false), None);

        monitor.observe(30.0, false);
        assert_eq!(monitor.observe(0.0, false), Some(MAX_STUN_SECS));

        monitor.observe(10.5, false);
        let stun = monitor.observe(0.0, false).unwrap();
        assert!((stun - 0.5375).abs() < 1e-6);
    }

    #[test]
    fn monitor_ignores_loss_while_immune_but_still_records_speed() {
        let mut monitor = StunMonitor::default();
        monitor.observe(40.0, false);
        assert_eq!(monitor.observe(0.0, true), None);
        assert_eq!(monitor.last_speed(), 0.0);
    }

    #[test]
    fn speeding_up_never_stuns() {
        let mut monitor = StunMonitor::default();
        monitor.observe(0.0, false);
        assert_eq!(monitor.observe(50.0, false), None);
    }

    #[test]
    fn reset_prevents_a_false_stun() {
        let mut monitor = StunMonitor::default();
        monitor.observe(40.0, false);
        monitor.reset(0.0);
        assert_eq!(monitor.observe(0.0, false), None);
    }
}
