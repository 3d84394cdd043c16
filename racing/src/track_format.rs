use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::course::SlowZone;
use crate::error::SetupError;

/// A level as stored on disk: the track centre line plus everything placed
/// along it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LevelFile {
    #[serde(default)]
    pub metadata: LevelMetadata,
    pub control_points: Vec<[f32; 2]>,
    #[serde(default)]
    pub slow_zones: Vec<SlowZoneDef>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LevelMetadata {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_track_width")]
    pub track_width: f32,
    /// Gates spread evenly along the track. The last one is the finish line.
    #[serde(default = "default_checkpoint_count")]
    pub checkpoint_count: u32,
    /// Distance between grid rows behind the finish line.
    #[serde(default = "default_grid_spacing")]
    pub grid_spacing: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SlowZoneDef {
    pub center: [f32; 2],
    pub radius: f32,
    #[serde(default = "default_zone_drag")]
    pub drag: f32,
}

impl Default for LevelMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            author: String::new(),
            track_width: default_track_width(),
            checkpoint_count: default_checkpoint_count(),
            grid_spacing: default_grid_spacing(),
        }
    }
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_track_width() -> f32 {
    12.0
}

fn default_checkpoint_count() -> u32 {
    8
}

fn default_grid_spacing() -> f32 {
    4.0
}

fn default_zone_drag() -> f32 {
    3.0
}

impl SlowZoneDef {
    pub fn to_zone(&self) -> SlowZone {
        SlowZone {
            center: Vec2::from(self.center),
            radius: self.radius,
            drag: self.drag,
        }
    }
}

impl LevelFile {
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let text = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SetupError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SetupError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| SetupError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn control_points_vec2(&self) -> Vec<Vec2> {
        self.control_points.iter().map(|&p| Vec2::from(p)).collect()
    }

    pub fn slow_zones(&self) -> Vec<SlowZone> {
        self.slow_zones.iter().map(SlowZoneDef::to_zone).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_level_fills_in_metadata() {
        let level: LevelFile =
            toml::from_str("control_points = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]").unwrap();
        assert_eq!(level.metadata.name, "Untitled");
        assert_eq!(level.metadata.checkpoint_count, 8);
        assert_eq!(level.control_points_vec2()[1], Vec2::new(10.0, 0.0));
        assert!(level.slow_zones().is_empty());
    }

    #[test]
    fn slow_zones_parse_with_default_drag() {
        let text = r#"
            control_points = []

            [metadata]
            name = "Dairy Dash"
            checkpoint_count = 4

            [[slow_zones]]
            center = [5.0, 5.0]
            radius = 3.0

            [[slow_zones]]
            center = [-5.0, 5.0]
            radius = 2.0
            drag = 6.0
        "#;
        let level: LevelFile = toml::from_str(text).unwrap();
        assert_eq!(level.metadata.checkpoint_count, 4);
        let zones = level.slow_zones();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].drag, 3.0);
        assert_eq!(zones[1].drag, 6.0);
        assert!(zones[0].contains(Vec2::new(6.0, 6.0)));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = LevelFile::load(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
