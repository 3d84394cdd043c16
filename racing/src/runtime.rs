//! Bevy/avian host for a [`Session`]: spawns the karts, feeds keyboard and
//! gamepad input in, runs the two ticks and republishes race events as
//! messages.

use avian2d::prelude::*;
use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::PlayerId;
use crate::body::Body;
use crate::config::SessionConfig;
use crate::error::SetupError;
use crate::input::{InputAction, InputEvent};
use crate::session::{RaceEvent, Session};

pub const FIXED_TICK_HZ: u32 = 200;

const KART_SIZE: Vec2 = Vec2::new(1.25, 2.0);
const KART_COLORS: [Color; 4] = [
    Color::srgb(0.9, 0.2, 0.2),
    Color::srgb(0.2, 0.4, 0.9),
    Color::srgb(0.9, 0.8, 0.1),
    Color::srgb(0.2, 0.8, 0.3),
];

pub struct RaceRuntimePlugin;

impl Plugin for RaceRuntimePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Gravity::ZERO)
            .insert_resource(Time::<Fixed>::from_duration(
                std::time::Duration::from_secs_f32(1.0 / FIXED_TICK_HZ as f32),
            ))
            .add_message::<RaceNotice>()
            .add_systems(Startup, spawn_karts)
            .configure_sets(
                Update,
                (RaceSystems::Input, RaceSystems::Session, RaceSystems::Dispatch).chain(),
            )
            .add_systems(
                Update,
                (
                    read_player_input.in_set(RaceSystems::Input),
                    update_session.in_set(RaceSystems::Session),
                    dispatch_race_events.in_set(RaceSystems::Dispatch),
                ),
            )
            .add_systems(FixedUpdate, physics_tick);
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RaceSystems {
    Input,
    Session,
    Dispatch,
}

#[derive(Resource)]
pub struct RaceSession(pub Session);

/// A race event, republished for the HUD, audio and camera systems.
#[derive(Message, Clone, Debug)]
pub struct RaceNotice(pub RaceEvent);

#[derive(Component)]
pub struct Kart {
    pub player: PlayerId,
}

type KartParts = (
    &'static Kart,
    &'static mut Transform,
    &'static mut LinearVelocity,
    &'static mut AngularVelocity,
    &'static mut LinearDamping,
);

// ── Input bindings ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerKeys {
    pub player: PlayerId,
    pub charge: KeyCode,
    pub horn: KeyCode,
    pub steer_left: KeyCode,
    pub steer_right: KeyCode,
    pub respawn: KeyCode,
    pub gamepad: Option<usize>,
}

#[derive(Resource, Clone, Debug, Default)]
pub struct KeyBindings {
    pub players: Vec<PlayerKeys>,
}

impl KeyBindings {
    /// Resolve every active player's key names, failing on the first unknown
    /// one.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SetupError> {
        let mut players = Vec::new();
        for player in config.active_players()? {
            let key = |name: &str| {
                parse_key(name).ok_or_else(|| SetupError::UnknownKey {
                    player: player.id,
                    key: name.to_string(),
                })
            };
            let binding = &player.binding;
            players.push(PlayerKeys {
                player: player.player_id(),
                charge: key(&binding.charge)?,
                horn: key(&binding.horn)?,
                steer_left: key(&binding.steer_left)?,
                steer_right: key(&binding.steer_right)?,
                respawn: key(&binding.respawn)?,
                gamepad: binding.gamepad,
            });
        }
        Ok(Self { players })
    }
}

/// Map a `KeyCode` variant name to the key.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    const LETTERS: [KeyCode; 26] = [
        KeyCode::KeyA,
        KeyCode::KeyB,
        KeyCode::KeyC,
        KeyCode::KeyD,
        KeyCode::KeyE,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyI,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::KeyM,
        KeyCode::KeyN,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::KeyQ,
        KeyCode::KeyR,
        KeyCode::KeyS,
        KeyCode::KeyT,
        KeyCode::KeyU,
        KeyCode::KeyV,
        KeyCode::KeyW,
        KeyCode::KeyX,
        KeyCode::KeyY,
        KeyCode::KeyZ,
    ];
    const DIGITS: [KeyCode; 10] = [
        KeyCode::Digit0,
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    const NUMPAD: [KeyCode; 10] = [
        KeyCode::Numpad0,
        KeyCode::Numpad1,
        KeyCode::Numpad2,
        KeyCode::Numpad3,
        KeyCode::Numpad4,
        KeyCode::Numpad5,
        KeyCode::Numpad6,
        KeyCode::Numpad7,
        KeyCode::Numpad8,
        KeyCode::Numpad9,
    ];

    let single = |rest: &str, base: u8| {
        let mut chars = rest.bytes();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c.checked_sub(base).map(usize::from),
            _ => None,
        }
    };
    if let Some(rest) = name.strip_prefix("Key") {
        return single(rest, b'A').and_then(|i| LETTERS.get(i).copied());
    }
    if let Some(rest) = name.strip_prefix("Digit") {
        return single(rest, b'0').and_then(|i| DIGITS.get(i).copied());
    }
    if let Some(rest) = name.strip_prefix("Numpad") {
        if let Some(i) = single(rest, b'0') {
            return NUMPAD.get(i).copied();
        }
    }

    let key = match name {
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        "Space" => KeyCode::Space,
        "Enter" => KeyCode::Enter,
        "NumpadEnter" => KeyCode::NumpadEnter,
        "Tab" => KeyCode::Tab,
        "Backspace" => KeyCode::Backspace,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "ShiftRight" => KeyCode::ShiftRight,
        "ControlLeft" => KeyCode::ControlLeft,
        "ControlRight" => KeyCode::ControlRight,
        "AltLeft" => KeyCode::AltLeft,
        "AltRight" => KeyCode::AltRight,
        "Comma" => KeyCode::Comma,
        "Period" => KeyCode::Period,
        "Slash" => KeyCode::Slash,
        "Semicolon" => KeyCode::Semicolon,
        "Quote" => KeyCode::Quote,
        "BracketLeft" => KeyCode::BracketLeft,
        "BracketRight" => KeyCode::BracketRight,
        _ => return None,
    };
    Some(key)
}

// ── Body adapter ────────────────────────────────────────────────────────────

/// An avian rigid body seen through [`Body`]. Forces are turned into
/// velocity over `dt` since the body's components are borrowed directly.
pub struct CarBody<'a> {
    transform: Mut<'a, Transform>,
    velocity: Mut<'a, LinearVelocity>,
    angular: Mut<'a, AngularVelocity>,
    damping: Mut<'a, LinearDamping>,
    mass: f32,
    dt: f32,
}

impl Body for CarBody<'_> {
    fn position(&self) -> Vec2 {
        self.transform.translation.xy()
    }

    fn forward(&self) -> Vec2 {
        self.transform.up().xy().normalize_or(Vec2::Y)
    }

    fn velocity(&self) -> Vec2 {
        self.velocity.0
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity.0 = velocity;
    }

    fn set_angular_velocity(&mut self, radians_per_sec: f32) {
        self.angular.0 = radians_per_sec;
    }

    fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity.0 += impulse / self.mass;
    }

    fn apply_force(&mut self, force: Vec2) {
        self.velocity.0 += force / self.mass * self.dt;
    }

    fn rotate(&mut self, radians: f32) {
        self.transform.rotate_z(radians);
    }

    fn is_grounded(&self) -> bool {
        // Top-down track, there is nothing to fall off.
        true
    }

    fn teleport(&mut self, position: Vec2, forward: Vec2) {
        self.transform.translation.x = position.x;
        self.transform.translation.y = position.y;
        self.transform.rotation = Quat::from_rotation_z(Vec2::Y.angle_to(forward));
    }

    fn drag(&self) -> f32 {
        self.damping.0
    }

    fn set_drag(&mut self, drag: f32) {
        self.damping.0 = drag;
    }
}

/// Borrow every kart as a body, ordered by player slot.
fn kart_bodies<'a>(
    karts: &'a mut Query<KartParts>,
    session: &Session,
    dt: f32,
) -> Vec<CarBody<'a>> {
    let mut bodies: Vec<(usize, CarBody<'a>)> = karts
        .iter_mut()
        .filter_map(|(kart, transform, velocity, angular, damping)| {
            let slot = kart.player.slot()?;
            let mass = session.player(kart.player)?.motion().tuning().mass;
            Some((
                slot,
                CarBody {
                    transform,
                    velocity,
                    angular,
                    damping,
                    mass,
                    dt,
                },
            ))
        })
        .collect();
    bodies.sort_by_key(|(slot, _)| *slot);
    bodies.into_iter().map(|(_, body)| body).collect()
}

// ── Systems ─────────────────────────────────────────────────────────────────

fn spawn_karts(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    session: Res<RaceSession>,
) {
    let session = &session.0;
    for (slot, point) in session.starting_grid().iter().enumerate() {
        let player = PlayerId::from_slot(slot);
        let Some(state) = session.player(player) else {
            continue;
        };
        let angle = Vec2::Y.angle_to(point.forward);
        commands
            .spawn((
                Transform::from_xyz(point.position.x, point.position.y, 1.0)
                    .with_rotation(Quat::from_rotation_z(angle)),
                Visibility::default(),
                RigidBody::Dynamic,
                Mass(state.motion().tuning().mass),
                LinearDamping(0.1),
                Friction::new(0.1),
                Restitution::new(0.2),
                Kart { player },
            ))
            .with_children(|parent| {
                parent.spawn((Collider::rectangle(KART_SIZE.x, KART_SIZE.y), Transform::default()));
                parent.spawn((
                    Mesh2d(meshes.add(Rectangle::new(KART_SIZE.x, KART_SIZE.y))),
                    MeshMaterial2d(materials.add(KART_COLORS[slot % KART_COLORS.len()])),
                    Transform::from_xyz(0.0, 0.0, 0.1),
                ));
            });
        info!(%player, "kart spawned");
    }
}

fn read_player_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    bindings: Res<KeyBindings>,
    mut session: ResMut<RaceSession>,
) {
    let pads: Vec<&Gamepad> = gamepads.iter().collect();

    for keys in &bindings.players {
        let pad = keys.gamepad.and_then(|index| pads.get(index).copied());
        let pressed = |key: KeyCode, button: GamepadButton| {
            keyboard.just_pressed(key) || pad.is_some_and(|p| p.just_pressed(button))
        };
        let released = |key: KeyCode, button: GamepadButton| {
            keyboard.just_released(key) || pad.is_some_and(|p| p.just_released(button))
        };
        let mut push = |action| session.0.push_input(InputEvent::new(keys.player, action));

        if pressed(keys.charge, GamepadButton::South) {
            push(InputAction::ChargePressed);
        }
        if released(keys.charge, GamepadButton::South) {
            push(InputAction::ChargeReleased);
        }
        if pressed(keys.horn, GamepadButton::West) {
            push(InputAction::HornPressed);
        }
        if released(keys.horn, GamepadButton::West) {
            push(InputAction::HornReleased);
        }
        if pressed(keys.respawn, GamepadButton::North) {
            push(InputAction::RespawnRequested);
        }

        let axis = |key: KeyCode| if keyboard.pressed(key) { 1.0 } else { 0.0 };
        let mut steer: f32 = axis(keys.steer_right) - axis(keys.steer_left);
        if let Some(stick) = pad.and_then(|p| p.get(GamepadAxis::LeftStickX)) {
            if stick.abs() > steer.abs() {
                steer = stick;
            }
        }
        // The axis is polled, so it goes in every frame.
        push(InputAction::Steer(steer));
    }
}

fn update_session(
    time: Res<Time>,
    mut session: ResMut<RaceSession>,
    mut karts: Query<KartParts>,
) {
    let dt = time.delta_secs();
    let mut bodies = kart_bodies(&mut karts, &session.0, dt);
    session.0.update(dt, &mut bodies);
}

fn physics_tick(
    time: Res<Time>,
    mut session: ResMut<RaceSession>,
    mut karts: Query<KartParts>,
) {
    let dt = time.delta_secs();
    let mut bodies = kart_bodies(&mut karts, &session.0, dt);
    if bodies.len() != session.0.players().len() {
        warn!(
            karts = bodies.len(),
            players = session.0.players().len(),
            "kart count does not match the session"
        );
        return;
    }
    session.0.physics_tick(dt, &mut bodies);
}

fn dispatch_race_events(
    mut session: ResMut<RaceSession>,
    mut karts: Query<KartParts>,
    mut notices: MessageWriter<RaceNotice>,
) {
    for event in session.0.drain_events() {
        match &event {
            RaceEvent::PhaseChanged(phase) => info!(?phase, "race phase"),
            RaceEvent::PlayerFinished { player, place } => info!(%player, place, "player finished"),
            RaceEvent::RaceComplete => info!("race complete"),
            RaceEvent::Summary(text) => info!("{text}"),
            RaceEvent::RestartRequested => {
                let mut bodies = kart_bodies(&mut karts, &session.0, 0.0);
                session.0.restart(&mut bodies);
            }
            other => debug!(?other, "race event"),
        }
        notices.write(RaceNotice(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_follow_keycode_variants() {
        assert_eq!(parse_key("KeyW"), Some(KeyCode::KeyW));
        assert_eq!(parse_key("KeyZ"), Some(KeyCode::KeyZ));
        assert_eq!(parse_key("Digit7"), Some(KeyCode::Digit7));
        assert_eq!(parse_key("Numpad0"), Some(KeyCode::Numpad0));
        assert_eq!(parse_key("NumpadEnter"), Some(KeyCode::NumpadEnter));
        assert_eq!(parse_key("ArrowLeft"), Some(KeyCode::ArrowLeft));
        assert_eq!(parse_key("ShiftRight"), Some(KeyCode::ShiftRight));
    }

    #[test]
    fn unknown_key_names_are_rejected() {
        assert_eq!(parse_key("Keyw"), None);
        assert_eq!(parse_key("KeyAB"), None);
        assert_eq!(parse_key("Digit"), None);
        assert_eq!(parse_key("Jump"), None);
    }

    #[test]
    fn default_bindings_resolve() {
        let bindings = KeyBindings::from_config(&SessionConfig::default()).unwrap();
        assert_eq!(bindings.players.len(), 2);
        assert_eq!(bindings.players[0].charge, KeyCode::KeyW);
        assert_eq!(bindings.players[1].steer_left, KeyCode::ArrowLeft);
        assert_eq!(bindings.players[1].gamepad, Some(1));
    }

    #[test]
    fn bad_binding_names_the_player_and_key() {
        let mut config = SessionConfig::default();
        config.players[1].binding.horn = "Horn".to_string();
        match KeyBindings::from_config(&config) {
            Err(SetupError::UnknownKey { player, key }) => {
                assert_eq!(player, 2);
                assert_eq!(key, "Horn");
            }
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }
}
