use bevy::prelude::*;

use crate::course::{Course, Gate};
use crate::error::SetupError;
use crate::motion::RespawnPoint;
use crate::track_format::LevelFile;

/// The track centre line, kept around for drawing.
#[derive(Resource)]
pub struct TrackSpline {
    pub spline: CubicCurve<Vec2>,
    pub width: f32,
}

/// Build a closed cubic B-spline from control points.
pub fn build_spline(control_points: &[Vec2]) -> Result<CubicCurve<Vec2>, SetupError> {
    if control_points.len() < 4 {
        return Err(SetupError::TrackTooShort(control_points.len()));
    }
    CubicBSpline::new(control_points.to_vec())
        .to_curve_cyclic()
        .map_err(|_| SetupError::TrackTooShort(control_points.len()))
}

/// Point on the centre line at `fraction` of the lap, with the driving
/// direction there.
fn sample(spline: &CubicCurve<Vec2>, fraction: f32) -> (Vec2, Vec2) {
    let t = fraction.rem_euclid(1.0) * spline.domain().end();
    let forward = spline.velocity(t).normalize_or(Vec2::Y);
    (spline.position(t), forward)
}

/// Gates spread evenly along the lap. Gate `count` sits at the start of the
/// spline and is the finish line.
pub fn build_gates(spline: &CubicCurve<Vec2>, track_width: f32, count: u32) -> Vec<Gate> {
    (1..=count)
        .map(|index| {
            let (center, forward) = sample(spline, index as f32 / count as f32);
            let half = forward.perp() * track_width * 0.5;
            Gate::new(index, center - half, center + half, forward)
        })
        .collect()
}

/// Starting grid behind the finish line, two cars per row.
pub fn build_grid(
    spline: &CubicCurve<Vec2>,
    track_width: f32,
    spacing: f32,
    slots: usize,
) -> Vec<RespawnPoint> {
    let (start, forward) = sample(spline, 0.0);
    let side = forward.perp() * track_width * 0.25;
    (0..slots)
        .map(|slot| {
            let row = (slot / 2 + 1) as f32;
            let lane = if slot % 2 == 0 { side } else { -side };
            RespawnPoint::new(start - forward * spacing * row + lane, forward)
        })
        .collect()
}

/// Everything the race logic needs from a level.
pub fn build_course(level: &LevelFile, grid_slots: usize) -> Result<Course, SetupError> {
    if level.metadata.checkpoint_count == 0 {
        return Err(SetupError::NoCheckpoints);
    }
    let spline = build_spline(&level.control_points_vec2())?;
    let width = level.metadata.track_width;
    Ok(Course {
        gates: build_gates(&spline, width, level.metadata.checkpoint_count),
        grid: build_grid(&spline, width, level.metadata.grid_spacing, grid_slots),
        slow_zones: level.slow_zones(),
    })
}

pub fn create_track_mesh(spline: &CubicCurve<Vec2>, track_width: f32, segments: usize) -> Mesh {
    let mut positions = Vec::with_capacity(segments * 2);
    let mut indices = Vec::with_capacity(segments * 6);

    for i in 0..segments {
        let (center, forward) = sample(spline, i as f32 / segments as f32);
        let half = forward.perp() * track_width * 0.5;
        let (left, right) = (center + half, center - half);
        positions.push([right.x, right.y, 0.0]);
        positions.push([left.x, left.y, 0.0]);

        let base = (i * 2) as u32;
        let next = ((i + 1) % segments * 2) as u32;
        indices.extend_from_slice(&[base, next, base + 1, base + 1, next, next + 1]);
    }

    let mut mesh = Mesh::new(
        bevy::mesh::PrimitiveTopology::TriangleList,
        bevy::asset::RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_indices(bevy::mesh::Indices::U32(indices));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_format::LevelMetadata;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(-50.0, -50.0),
            Vec2::new(50.0, -50.0),
            Vec2::new(50.0, 50.0),
            Vec2::new(-50.0, 50.0),
        ]
    }

    #[test]
    fn short_tracks_are_rejected() {
        assert!(matches!(
            build_spline(&square()[..3]),
            Err(SetupError::TrackTooShort(3))
        ));
    }

    #[test]
    fn finish_gate_sits_at_the_start_of_the_lap() {
        let spline = build_spline(&square()).unwrap();
        let gates = build_gates(&spline, 10.0, 4);
        assert_eq!(gates.len(), 4);
        assert_eq!(gates[0].index, 1);
        assert!(gates[3].center().distance(spline.position(0.0)) < 1e-3);
        for gate in &gates {
            assert!((gate.a.distance(gate.b) - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn grid_is_behind_the_finish_line() {
        let spline = build_spline(&square()).unwrap();
        let finish = &build_gates(&spline, 10.0, 4)[3];
        let grid = build_grid(&spline, 10.0, 4.0, 3);
        assert_eq!(grid.len(), 3);
        for point in &grid {
            assert!((point.position - finish.center()).dot(finish.forward) < 0.0);
        }
        assert_ne!(grid[0].position, grid[1].position);
    }

    #[test]
    fn driving_off_the_grid_crosses_gate_one_first() {
        let spline = build_spline(&square()).unwrap();
        let gates = build_gates(&spline, 10.0, 4);
        let domain_end = spline.domain().end();
        let mut prev = spline.position(0.5 / 400.0 * domain_end);
        let mut hits = Vec::new();
        for i in 1..=400 {
            let p = spline.position(i as f32 / 400.0 * domain_end);
            hits.extend(gates.iter().filter(|g| g.crossed(prev, p)).map(|g| g.index));
            prev = p;
        }
        assert_eq!(hits.first(), Some(&1));
        assert_eq!(hits.last(), Some(&4));
    }

    #[test]
    fn course_needs_checkpoints() {
        let level = LevelFile {
            metadata: LevelMetadata {
                checkpoint_count: 0,
                ..Default::default()
            },
            control_points: square().iter().map(|p| p.to_array()).collect(),
            slow_zones: Vec::new(),
        };
        assert!(matches!(
            build_course(&level, 2),
            Err(SetupError::NoCheckpoints)
        ));
    }

    #[test]
    fn bundled_level_builds_a_course() {
        let level: LevelFile = toml::from_str(include_str!("../assets/track1.toml")).unwrap();
        let course = build_course(&level, 2).unwrap();
        assert_eq!(course.checkpoint_count(), 8);
        assert_eq!(course.grid.len(), 2);
        assert_eq!(course.slow_zones.len(), 2);
    }
}
