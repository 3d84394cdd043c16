use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::curve::ResponseCurve;
use crate::error::SetupError;
use crate::PlayerId;

/// Top-level session configuration, loaded from `session.toml`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionConfig {
    #[serde(default)]
    pub race: RaceSettings,
    /// Tuning shared by every player that doesn't override it.
    #[serde(default)]
    pub tuning: PlayerTuning,
    #[serde(default = "default_players")]
    pub players: Vec<PlayerConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RaceSettings {
    #[serde(default = "default_laps")]
    pub laps: u32,
    /// How many of the configured players take part.
    #[serde(default = "default_player_count")]
    pub player_count: usize,
    #[serde(default = "default_pre_race_secs")]
    pub pre_race_secs: f32,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: f32,
    /// Time after the start before the countdown displays are hidden.
    #[serde(default = "default_countdown_grace_secs")]
    pub countdown_grace_secs: f32,
    #[serde(default = "default_post_race_secs")]
    pub post_race_secs: f32,
    #[serde(default = "default_intro_camera_priority")]
    pub intro_camera_priority: i32,
    /// Leaderboard points per finishing place.
    #[serde(default = "default_position_weight")]
    pub position_weight: u32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            laps: default_laps(),
            player_count: default_player_count(),
            pre_race_secs: default_pre_race_secs(),
            countdown_secs: default_countdown_secs(),
            countdown_grace_secs: default_countdown_grace_secs(),
            post_race_secs: default_post_race_secs(),
            intro_camera_priority: default_intro_camera_priority(),
            position_weight: default_position_weight(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlayerTuning {
    #[serde(default)]
    pub charge: ChargeTuning,
    #[serde(default)]
    pub motion: MotionTuning,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChargeTuning {
    /// Seconds to sweep the bar from empty to full.
    #[serde(default = "default_charge_time")]
    pub charge_time: f32,
    /// Impulse applied on release, scaled by charge + bonus.
    #[serde(default = "default_release_impulse")]
    pub release_impulse: f32,
    /// Seconds for the post-release acceleration to decay from 1 to 0.
    #[serde(default = "default_accel_decay_time")]
    pub accel_decay_time: f32,
    /// Cooldown after a full charge; scaled down by the released amount.
    #[serde(default = "default_charge_cooldown")]
    pub charge_cooldown: f32,
    /// Spin rate while charging, in degrees per 1/50 s at full steering.
    #[serde(default = "default_turning_sensitivity")]
    pub turning_sensitivity: f32,
    #[serde(default)]
    pub charge_curve: ResponseCurve,
    #[serde(default = "default_bonus_curve")]
    pub bonus_curve: ResponseCurve,
}

impl Default for ChargeTuning {
    fn default() -> Self {
        Self {
            charge_time: default_charge_time(),
            release_impulse: default_release_impulse(),
            accel_decay_time: default_accel_decay_time(),
            charge_cooldown: default_charge_cooldown(),
            turning_sensitivity: default_turning_sensitivity(),
            charge_curve: ResponseCurve::default(),
            bonus_curve: default_bonus_curve(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MotionTuning {
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Forward force at full acceleration.
    #[serde(default = "default_motor_force")]
    pub motor_force: f32,
    /// Yaw rate in rad/s at full steer once the car is up to speed.
    #[serde(default = "default_max_turn_rate")]
    pub max_turn_rate: f32,
    /// Speed at which steering reaches full authority.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,
    /// Rate at which sideways velocity is bled off while the wheels grip.
    #[serde(default = "default_lateral_grip")]
    pub lateral_grip: f32,
    #[serde(default = "default_respawn_secs")]
    pub respawn_secs: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            mass: default_mass(),
            motor_force: default_motor_force(),
            max_turn_rate: default_max_turn_rate(),
            turn_speed: default_turn_speed(),
            lateral_grip: default_lateral_grip(),
            respawn_secs: default_respawn_secs(),
        }
    }
}

/// Per-player setup: which inputs drive the player and where its HUD lives.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PlayerConfig {
    pub id: u8,
    #[serde(default)]
    pub binding: InputBinding,
    #[serde(default)]
    pub hud: HudSide,
    /// Replaces the session tuning for this player only.
    #[serde(default)]
    pub tuning: Option<PlayerTuning>,
}

impl PlayerConfig {
    pub fn player_id(&self) -> PlayerId {
        PlayerId(self.id)
    }
}

/// Key names follow Bevy's `KeyCode` variant names (`KeyA`, `ArrowLeft`, ...).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InputBinding {
    pub charge: String,
    pub horn: String,
    pub steer_left: String,
    pub steer_right: String,
    pub respawn: String,
    /// Index of the gamepad that also drives this player, if connected.
    #[serde(default)]
    pub gamepad: Option<usize>,
}

impl Default for InputBinding {
    fn default() -> Self {
        Self {
            charge: "KeyW".to_string(),
            horn: "KeyQ".to_string(),
            steer_left: "KeyA".to_string(),
            steer_right: "KeyD".to_string(),
            respawn: "KeyR".to_string(),
            gamepad: Some(0),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HudSide {
    #[default]
    Left,
    Right,
}

fn default_players() -> Vec<PlayerConfig> {
    vec![
        PlayerConfig {
            id: 1,
            binding: InputBinding::default(),
            hud: HudSide::Left,
            tuning: None,
        },
        PlayerConfig {
            id: 2,
            binding: InputBinding {
                charge: "ArrowUp".to_string(),
                horn: "ShiftRight".to_string(),
                steer_left: "ArrowLeft".to_string(),
                steer_right: "ArrowRight".to_string(),
                respawn: "Enter".to_string(),
                gamepad: Some(1),
            },
            hud: HudSide::Right,
            tuning: None,
        },
    ]
}

fn default_laps() -> u32 {
    3
}

fn default_player_count() -> usize {
    2
}

fn default_pre_race_secs() -> f32 {
    5.0
}

fn default_countdown_secs() -> f32 {
    3.0
}

fn default_countdown_grace_secs() -> f32 {
    1.0
}

fn default_post_race_secs() -> f32 {
    5.0
}

fn default_intro_camera_priority() -> i32 {
    9
}

fn default_position_weight() -> u32 {
    5
}

fn default_charge_time() -> f32 {
    1.0
}

fn default_release_impulse() -> f32 {
    600.0
}

fn default_accel_decay_time() -> f32 {
    2.0
}

fn default_charge_cooldown() -> f32 {
    2.0
}

fn default_turning_sensitivity() -> f32 {
    1.0
}

fn default_bonus_curve() -> ResponseCurve {
    ResponseCurve::new(vec![[0.0, 0.0], [0.85, 0.0], [1.0, 0.25]])
}

fn default_mass() -> f32 {
    40.0
}

fn default_motor_force() -> f32 {
    900.0
}

fn default_max_turn_rate() -> f32 {
    2.5
}

fn default_turn_speed() -> f32 {
    4.0
}

fn default_lateral_grip() -> f32 {
    8.0
}

fn default_respawn_secs() -> f32 {
    1.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            race: RaceSettings::default(),
            tuning: PlayerTuning::default(),
            players: default_players(),
        }
    }
}

impl SessionConfig {
    /// Load a session config from a TOML file.
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

    /// Save this config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), SetupError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| SetupError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The players taking part, in id order.
    pub fn active_players(&self) -> Result<Vec<&PlayerConfig>, SetupError> {
        if self.race.player_count == 0 {
            return Err(SetupError::NoPlayers);
        }
        if self.race.player_count > self.players.len() {
            return Err(SetupError::TooManyPlayers {
                requested: self.race.player_count,
                configured: self.players.len(),
            });
        }
        let mut players: Vec<&PlayerConfig> = self.players.iter().collect();
        players.sort_by_key(|p| p.id);
        players.truncate(self.race.player_count);
        Ok(players)
    }

    /// The effective tuning for one player.
    pub fn tuning_for<'a>(&'a self, player: &'a PlayerConfig) -> &'a PlayerTuning {
        player.tuning.as_ref().unwrap_or(&self.tuning)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.race.laps == 0 {
            return Err(SetupError::ZeroLaps);
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if player.id == 0 {
                return Err(SetupError::InvalidPlayerId(player.id));
            }
            if !seen.insert(player.id) {
                return Err(SetupError::DuplicatePlayer(player.id));
            }
        }

        let active = self.active_players()?;
        for (slot, player) in active.iter().enumerate() {
            if player.id as usize != slot + 1 {
                return Err(SetupError::InvalidPlayerId(player.id));
            }
            validate_tuning(self.tuning_for(player))?;
        }
        Ok(())
    }
}

fn validate_tuning(tuning: &PlayerTuning) -> Result<(), SetupError> {
    let charge = &tuning.charge;
    if charge.charge_time <= 0.0 {
        return Err(SetupError::NonPositive("charge_time"));
    }
    if charge.accel_decay_time <= 0.0 {
        return Err(SetupError::NonPositive("accel_decay_time"));
    }
    if tuning.motion.mass <= 0.0 {
        return Err(SetupError::NonPositive("mass"));
    }
    charge.charge_curve.validate("charge_curve")?;
    charge.bonus_curve.validate("bonus_curve")?;
    Ok(())
}
