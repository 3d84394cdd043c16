use std::error::Error;
use std::path::PathBuf;

use avian2d::prelude::*;
use bevy::{
    camera::{Viewport, visibility::RenderLayers},
    log::LogPlugin,
    prelude::*,
};
use clap::Parser;

use windup_racing::PlayerId;
use windup_racing::config::SessionConfig;
use windup_racing::runtime::{Kart, KeyBindings, RaceNotice, RaceRuntimePlugin, RaceSession};
use windup_racing::sequencer::Phase;
use windup_racing::session::{RaceEvent, Session};
use windup_racing::track::{self, TrackSpline};
use windup_racing::track_format::LevelFile;

mod hud;

/// Priority of the per-player chase cameras. The intro camera shows while
/// its priority is at least this.
const PLAYER_CAMERA_PRIORITY: i32 = 10;
const CHASE_ZOOM: f32 = 0.05;
const HUD_LAYER: usize = 1;

#[derive(Parser, Debug)]
#[command(name = "windup-racing", about = "Split-screen wind-up kart racing")]
struct Cli {
    /// Level file to race on
    #[arg(long, default_value = "racing/assets/track1.toml")]
    track: PathBuf,

    /// Session config; defaults are used when the file does not exist
    #[arg(long, default_value = "racing/assets/session.toml")]
    config: PathBuf,

    /// Override the configured player count
    #[arg(long)]
    players: Option<usize>,

    /// Override the configured lap count
    #[arg(long)]
    laps: Option<u32>,
}

#[derive(Component)]
struct IntroCamera;

#[derive(Component)]
struct ChaseCamera(PlayerId);

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        SessionConfig::load(&cli.config)?
    } else {
        SessionConfig::default()
    };
    if let Some(players) = cli.players {
        config.race.player_count = players;
    }
    if let Some(laps) = cli.laps {
        config.race.laps = laps;
    }

    let level = LevelFile::load(&cli.track)?;
    let course = track::build_course(&level, config.race.player_count)?;
    let spline = track::build_spline(&level.control_points_vec2())?;
    let bindings = KeyBindings::from_config(&config)?;
    let session = Session::new(config, course)?;

    App::new()
        .add_plugins((
            DefaultPlugins.set(LogPlugin {
                filter: "wgpu=error,naga=warn,windup_racing=info".to_string(),
                ..default()
            }),
            PhysicsPlugins::default(),
            RaceRuntimePlugin,
            hud::RaceHudPlugin,
        ))
        .insert_resource(RaceSession(session))
        .insert_resource(bindings)
        .insert_resource(TrackSpline {
            spline,
            width: level.metadata.track_width,
        })
        .add_systems(Startup, (setup_track, setup_cameras))
        .add_systems(
            Update,
            (switch_cameras, layout_viewports, follow_karts, draw_course),
        )
        .run();
    Ok(())
}

fn setup_track(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    track: Res<TrackSpline>,
) {
    commands.spawn((
        Mesh2d(meshes.add(Rectangle::new(800.0, 800.0))),
        MeshMaterial2d(materials.add(Color::srgb(0.2, 0.6, 0.2))),
        Transform::from_xyz(0.0, 0.0, -1.0),
    ));

    let track_mesh = track::create_track_mesh(&track.spline, track.width, 1000);
    commands.spawn((
        Mesh2d(meshes.add(track_mesh)),
        MeshMaterial2d(materials.add(Color::srgb(0.3, 0.3, 0.3))),
        Transform::from_xyz(0.0, 0.0, 0.0),
    ));
}

fn setup_cameras(mut commands: Commands, track: Res<TrackSpline>, session: Res<RaceSession>) {
    // Frame the whole track for the intro.
    let end = track.spline.domain().end();
    let points: Vec<Vec2> = (0..200)
        .map(|i| track.spline.position(i as f32 / 200.0 * end))
        .collect();
    let min = points.iter().copied().fold(Vec2::MAX, Vec2::min);
    let max = points.iter().copied().fold(Vec2::MIN, Vec2::max);
    let center = (min + max) * 0.5;
    let extent = (max - min).max_element() + track.width * 2.0;

    commands.spawn((
        Camera2d,
        Camera {
            order: 0,
            ..default()
        },
        Projection::Orthographic(OrthographicProjection {
            scale: (extent / 600.0).max(CHASE_ZOOM),
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_xyz(center.x, center.y, 0.0),
        IntroCamera,
    ));

    for (slot, player) in session.0.players().iter().enumerate() {
        commands.spawn((
            Camera2d,
            Camera {
                order: slot as isize + 1,
                is_active: false,
                ..default()
            },
            Projection::Orthographic(OrthographicProjection {
                scale: CHASE_ZOOM,
                ..OrthographicProjection::default_2d()
            }),
            ChaseCamera(player.id()),
        ));
    }

    // The HUD gets its own camera on an empty layer so it draws over every
    // viewport.
    commands.spawn((
        Camera2d,
        Camera {
            order: 100,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        RenderLayers::layer(HUD_LAYER),
        IsDefaultUiCamera,
    ));
}

fn switch_cameras(
    mut notices: MessageReader<RaceNotice>,
    mut intro: Query<&mut Camera, (With<IntroCamera>, Without<ChaseCamera>)>,
    mut chase: Query<&mut Camera, (With<ChaseCamera>, Without<IntroCamera>)>,
) {
    for RaceNotice(event) in notices.read() {
        let intro_active = match event {
            RaceEvent::CameraPriority(priority) => *priority >= PLAYER_CAMERA_PRIORITY,
            RaceEvent::PhaseChanged(Phase::PreRace) => true,
            _ => continue,
        };
        for mut camera in &mut intro {
            camera.is_active = intro_active;
        }
        for mut camera in &mut chase {
            camera.is_active = !intro_active;
        }
    }
}

/// Split the window into one column per player.
fn layout_viewports(windows: Query<&Window>, mut cameras: Query<(&ChaseCamera, &mut Camera)>) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window.physical_size();
    let count = cameras.iter().count().max(1) as u32;
    let width = size.x / count;
    if width == 0 || size.y == 0 {
        return;
    }

    for (chase, mut camera) in &mut cameras {
        let Some(slot) = chase.0.slot() else {
            continue;
        };
        let viewport = Viewport {
            physical_position: UVec2::new(width * slot as u32, 0),
            physical_size: UVec2::new(width, size.y),
            ..default()
        };
        let stale = camera.viewport.as_ref().is_none_or(|current| {
            current.physical_size != viewport.physical_size
                || current.physical_position != viewport.physical_position
        });
        if stale {
            camera.viewport = Some(viewport);
        }
    }
}

fn follow_karts(
    karts: Query<(&Kart, &Transform)>,
    mut cameras: Query<(&ChaseCamera, &mut Transform), Without<Kart>>,
) {
    for (chase, mut camera_transform) in &mut cameras {
        if let Some((_, kart)) = karts.iter().find(|(kart, _)| kart.player == chase.0) {
            camera_transform.translation.x = kart.translation.x;
            camera_transform.translation.y = kart.translation.y;
        }
    }
}

fn draw_course(session: Res<RaceSession>, mut gizmos: Gizmos) {
    let course = session.0.course();
    let finish = course.checkpoint_count();
    for gate in &course.gates {
        let color = if gate.index == finish {
            Color::WHITE
        } else {
            Color::srgba(1.0, 1.0, 1.0, 0.25)
        };
        gizmos.line_2d(gate.a, gate.b, color);
    }
    for zone in &course.slow_zones {
        gizmos.circle_2d(
            Isometry2d::from_translation(zone.center),
            zone.radius,
            Color::srgb(0.95, 0.85, 0.9),
        );
    }
}
