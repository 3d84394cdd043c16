use bevy::prelude::*;

use windup_racing::PlayerId;
use windup_racing::config::HudSide;
use windup_racing::runtime::{RaceNotice, RaceSession, RaceSystems};
use windup_racing::sequencer::Phase;
use windup_racing::session::RaceEvent;

pub struct RaceHudPlugin;

impl Plugin for RaceHudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_hud).add_systems(
            Update,
            (handle_notices, update_player_panels, update_countdown)
                .chain()
                .after(RaceSystems::Dispatch),
        );
    }
}

#[derive(Component)]
enum HudField {
    Lap(PlayerId),
    Place(PlayerId),
    Status(PlayerId),
}

#[derive(Component)]
struct ChargeBar(PlayerId);
#[derive(Component)]
struct ChargeFill(PlayerId);
#[derive(Component)]
struct CountdownText;
#[derive(Component)]
struct ResultsText;

const PANEL_BG: Color = Color::srgba(0.08, 0.08, 0.12, 0.75);
const TEXT_COLOR: Color = Color::srgb(0.9, 0.9, 0.9);
const STATUS_COLOR: Color = Color::srgb(1.0, 0.75, 0.2);
const BAR_BG: Color = Color::srgb(0.2, 0.2, 0.25);
const BAR_FILL: Color = Color::srgb(0.95, 0.55, 0.1);
const BAR_WIDTH: f32 = 180.0;

fn px(val: f32) -> Val {
    Val::Px(val)
}

fn text_font(size: f32) -> TextFont {
    TextFont {
        font_size: size,
        ..default()
    }
}

fn setup_hud(mut commands: Commands, session: Res<RaceSession>) {
    let mut stacked = [0.0_f32; 2];
    for player in session.0.players() {
        let id = player.id();
        let side = player.config().hud;
        let top = &mut stacked[side as usize];
        let mut node = Node {
            position_type: PositionType::Absolute,
            top: px(8.0 + *top),
            flex_direction: FlexDirection::Column,
            padding: UiRect::axes(px(10.0), px(6.0)),
            row_gap: px(4.0),
            ..default()
        };
        match side {
            HudSide::Left => node.left = px(8.0),
            HudSide::Right => node.right = px(8.0),
        }
        *top += 110.0;

        commands
            .spawn((node, BackgroundColor(PANEL_BG)))
            .with_children(|panel| {
                panel.spawn((
                    Text::new(format!("Player {id}")),
                    text_font(18.0),
                    TextColor(TEXT_COLOR),
                ));
                panel.spawn((
                    Text::new(""),
                    HudField::Lap(id),
                    text_font(16.0),
                    TextColor(TEXT_COLOR),
                ));
                panel
                    .spawn((
                        Node {
                            width: px(BAR_WIDTH),
                            height: px(14.0),
                            ..default()
                        },
                        BackgroundColor(BAR_BG),
                        Visibility::Hidden,
                        ChargeBar(id),
                    ))
                    .with_children(|bar| {
                        bar.spawn((
                            Node {
                                width: px(0.0),
                                height: Val::Percent(100.0),
                                ..default()
                            },
                            BackgroundColor(BAR_FILL),
                            ChargeFill(id),
                        ));
                    });
                panel.spawn((
                    Text::new(""),
                    HudField::Status(id),
                    text_font(16.0),
                    TextColor(STATUS_COLOR),
                ));
                panel.spawn((
                    Text::new(""),
                    HudField::Place(id),
                    text_font(16.0),
                    TextColor(TEXT_COLOR),
                ));
            });
    }

    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            top: Val::Percent(35.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
        Text::new(""),
        TextLayout::new_with_justify(Justify::Center),
        text_font(72.0),
        TextColor(TEXT_COLOR),
        Visibility::Hidden,
        CountdownText,
    ));

    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            top: Val::Percent(30.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
        Text::new(""),
        TextLayout::new_with_justify(Justify::Center),
        text_font(32.0),
        TextColor(TEXT_COLOR),
        Visibility::Hidden,
        ResultsText,
    ));
}

fn handle_notices(
    mut notices: MessageReader<RaceNotice>,
    mut countdown: Query<&mut Visibility, (With<CountdownText>, Without<ResultsText>)>,
    mut results: Query<(&mut Text, &mut Visibility), (With<ResultsText>, Without<CountdownText>)>,
) {
    for RaceNotice(event) in notices.read() {
        match event {
            RaceEvent::CountdownVisible(visible) => {
                if let Ok(mut visibility) = countdown.single_mut() {
                    *visibility = if *visible {
                        Visibility::Visible
                    } else {
                        Visibility::Hidden
                    };
                }
            }
            RaceEvent::Summary(summary) => show_results(&mut results, summary.clone()),
            RaceEvent::Leaderboard(board) => {
                let lines: Vec<String> = board.iter().map(ToString::to_string).collect();
                show_results(&mut results, format!("Results\n{}", lines.join("\n")));
            }
            RaceEvent::PhaseChanged(Phase::PreRace) => {
                if let Ok((mut text, mut visibility)) = results.single_mut() {
                    text.0.clear();
                    *visibility = Visibility::Hidden;
                }
            }
            _ => {}
        }
    }
}

fn show_results(
    results: &mut Query<(&mut Text, &mut Visibility), (With<ResultsText>, Without<CountdownText>)>,
    content: String,
) {
    if let Ok((mut text, mut visibility)) = results.single_mut() {
        text.0 = content;
        *visibility = Visibility::Visible;
    }
}

fn update_player_panels(
    session: Res<RaceSession>,
    mut fields: Query<(&HudField, &mut Text)>,
    mut bars: Query<(&ChargeBar, &mut Visibility)>,
    mut fills: Query<(&ChargeFill, &mut Node)>,
) {
    let session = &session.0;

    for (field, mut text) in &mut fields {
        let content = match *field {
            HudField::Lap(id) => session
                .hud(id)
                .map(|hud| format!("Lap {}/{}", hud.lap, hud.total_laps)),
            HudField::Place(id) => session.hud(id).map(|hud| {
                if hud.finished {
                    format!("Finished #{}", hud.place)
                } else {
                    String::new()
                }
            }),
            HudField::Status(id) => session.player(id).map(|player| {
                if player.charge().is_effectively_stunned() {
                    "STUNNED".to_string()
                } else if player.horn_sounding() {
                    "HONK!".to_string()
                } else {
                    String::new()
                }
            }),
        };
        if let Some(content) = content {
            if text.0 != content {
                text.0 = content;
            }
        }
    }

    for (bar, mut visibility) in &mut bars {
        let visible = session.hud(bar.0).is_some_and(|hud| hud.bar_visible);
        visibility.set_if_neq(if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });
    }

    for (fill, mut node) in &mut fills {
        if let Some(hud) = session.hud(fill.0) {
            node.width = px(BAR_WIDTH * hud.charge_fill.clamp(0.0, 1.0));
        }
    }
}

fn update_countdown(session: Res<RaceSession>, mut text: Query<&mut Text, With<CountdownText>>) {
    let Ok(mut text) = text.single_mut() else {
        return;
    };
    let content = match session.0.sequencer().countdown_remaining() {
        Some(remaining) => format!("{}", remaining.ceil().max(1.0) as u32),
        None => "GO!".to_string(),
    };
    if text.0 != content {
        text.0 = content;
    }
}
