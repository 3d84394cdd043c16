//! Level geometry the race logic needs: checkpoint gates, the starting grid
//! and slow zones.

use bevy::math::Vec2;

use crate::body::Body;
use crate::motion::RespawnPoint;

/// A checkpoint realised as a line segment across the track.
///
/// A car passes the gate when its movement over one tick crosses the segment
/// in the driving direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    /// 1-based checkpoint index.
    pub index: u32,
    pub a: Vec2,
    pub b: Vec2,
    /// Driving direction through the gate.
    pub forward: Vec2,
}

impl Gate {
    pub fn new(index: u32, a: Vec2, b: Vec2, forward: Vec2) -> Self {
        Self {
            index,
            a,
            b,
            forward: forward.normalize_or(Vec2::Y),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }

    /// Where a car that passed this gate comes back after a respawn.
    pub fn respawn_point(&self) -> RespawnPoint {
        RespawnPoint::new(self.center(), self.forward)
    }

    pub fn crossed(&self, from: Vec2, to: Vec2) -> bool {
        let motion = to - from;
        if motion.dot(self.forward) <= 0.0 {
            return false;
        }
        segments_intersect(from, to, self.a, self.b)
    }
}

fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.perp_dot(s);
    if denom.abs() < f32::EPSILON {
        return false;
    }
    let qp = q1 - p1;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    // Starting on the line is not a crossing, so a car respawned onto a gate
    // has to come round again.
    t > 0.0 && t <= 1.0 && (0.0..=1.0).contains(&u)
}

/// A circular patch of track that swaps the body's drag while it is inside.
#[derive(Clone, Debug, PartialEq)]
pub struct SlowZone {
    pub center: Vec2,
    pub radius: f32,
    pub drag: f32,
}

impl SlowZone {
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Per-player slow zone bookkeeping: remembers the drag to restore on exit.
#[derive(Clone, Debug, Default)]
pub struct ZoneTracker {
    inside: Option<usize>,
    saved_drag: Option<f32>,
}

impl ZoneTracker {
    pub fn inside(&self) -> Option<usize> {
        self.inside
    }

    pub fn update(&mut self, zones: &[SlowZone], body: &mut dyn Body) {
        let position = body.position();
        let now = zones.iter().position(|zone| zone.contains(position));
        if now == self.inside {
            return;
        }

        match now {
            Some(index) => {
                if self.saved_drag.is_none() {
                    self.saved_drag = Some(body.drag());
                }
                body.set_drag(zones[index].drag);
            }
            None => {
                if let Some(drag) = self.saved_drag.take() {
                    body.set_drag(drag);
                }
            }
        }
        self.inside = now;
    }

    /// Restore the saved drag, if any, and forget the current zone.
    pub fn leave(&mut self, body: &mut dyn Body) {
        if let Some(drag) = self.saved_drag.take() {
            body.set_drag(drag);
        }
        self.inside = None;
    }
}

/// Everything a session needs to know about the level.
#[derive(Clone, Debug, Default)]
pub struct Course {
    /// Gates ordered by index, 1..=n.
    pub gates: Vec<Gate>,
    /// Starting grid, one slot per player.
    pub grid: Vec<RespawnPoint>,
    pub slow_zones: Vec<SlowZone>,
}

impl Course {
    pub fn checkpoint_count(&self) -> u32 {
        self.gates.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::test_body::TestBody;

    fn gate() -> Gate {
        Gate::new(1, Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), Vec2::Y)
    }

    #[test]
    fn crossing_forward_counts() {
        assert!(gate().crossed(Vec2::new(0.0, -1.0), Vec2::new(0.5, 1.0)));
    }

    #[test]
    fn crossing_backwards_does_not_count() {
        assert!(!gate().crossed(Vec2::new(0.0, 1.0), Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn passing_beside_the_gate_does_not_count() {
        assert!(!gate().crossed(Vec2::new(8.0, -1.0), Vec2::new(8.0, 1.0)));
        assert!(!gate().crossed(Vec2::new(0.0, 1.0), Vec2::new(0.0, 3.0)));
    }

    #[test]
    fn leaving_from_the_gate_line_does_not_count() {
        assert!(!gate().crossed(Vec2::ZERO, Vec2::new(0.0, 2.0)));
        assert!(gate().crossed(Vec2::new(0.0, -2.0), Vec2::ZERO));
    }

    #[test]
    fn respawn_point_sits_on_the_gate_facing_forward() {
        let point = gate().respawn_point();
        assert_eq!(point.position, Vec2::ZERO);
        assert_eq!(point.forward, Vec2::Y);
    }

    #[test]
    fn zone_swaps_drag_on_entry_and_restores_on_exit() {
        let zones = vec![SlowZone {
            center: Vec2::ZERO,
            radius: 2.0,
            drag: 4.0,
        }];
        let mut tracker = ZoneTracker::default();
        let mut body = TestBody {
            position: Vec2::new(10.0, 0.0),
            drag: 0.3,
            ..Default::default()
        };

        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 0.3);

        body.position = Vec2::new(1.0, 0.0);
        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 4.0);
        assert_eq!(tracker.inside(), Some(0));

        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 4.0);

        body.position = Vec2::new(3.0, 0.0);
        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 0.3);
        assert_eq!(tracker.inside(), None);
    }

    #[test]
    fn moving_between_overlapping_zones_keeps_the_original_drag() {
        let zones = vec![
            SlowZone {
                center: Vec2::ZERO,
                radius: 2.0,
                drag: 4.0,
            },
            SlowZone {
                center: Vec2::new(3.0, 0.0),
                radius: 2.0,
                drag: 6.0,
            },
        ];
        let mut tracker = ZoneTracker::default();
        let mut body = TestBody {
            drag: 0.5,
            ..Default::default()
        };

        tracker.update(&zones, &mut body);
        body.position = Vec2::new(4.0, 0.0);
        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 6.0);

        body.position = Vec2::new(20.0, 0.0);
        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 0.5);
    }

    #[test]
    fn leave_restores_drag_without_an_exit() {
        let zones = vec![SlowZone {
            center: Vec2::ZERO,
            radius: 2.0,
            drag: 9.0,
        }];
        let mut tracker = ZoneTracker::default();
        let mut body = TestBody::default();
        tracker.update(&zones, &mut body);
        assert_eq!(body.drag, 9.0);

        tracker.leave(&mut body);
        assert_eq!(body.drag, 0.1);
        assert_eq!(tracker.inside(), None);
    }
}
