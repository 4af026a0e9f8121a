use bevy::prelude::*;

use crate::game::SceneEntity;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_health_changed)
            .add_observer(on_resource_count_changed)
            .add_observer(on_boss_health_changed)
            .add_observer(on_show_end_panel)
            .add_observer(on_toggle_settings_panel);
    }
}

// ── Events ──────────────────────────────────────────────────────────────────
// One-way notifications. Nothing here is ever read back by gameplay code.

#[derive(Event, Debug)]
pub struct HealthChanged(pub u32);

#[derive(Event, Debug)]
pub struct ResourceCountChanged(pub u32);

#[derive(Event, Debug)]
pub struct BossHealthChanged {
    pub current: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPanel {
    GameOver,
    Clear,
}

impl EndPanel {
    fn message(self) -> &'static str {
        match self {
            EndPanel::GameOver => "GAME OVER\nR: retry   M: menu",
            EndPanel::Clear => "STAGE CLEAR!\nR: play again   M: menu",
        }
    }
}

#[derive(Event, Debug)]
pub struct ShowEndPanel(pub EndPanel);

#[derive(Event, Debug)]
pub struct ToggleSettingsPanel;

// ── Widgets ─────────────────────────────────────────────────────────────────

#[derive(Component)]
pub struct HealthText;

#[derive(Component)]
pub struct ResourceCountText;

#[derive(Component)]
pub struct BossHealthText;

#[derive(Component)]
pub struct EndPanelNode;

#[derive(Component)]
pub struct EndPanelText;

#[derive(Component)]
pub struct SettingsPanel;

fn health_label(health: u32) -> String {
    format!("HP {health}")
}

fn count_label(count: u32) -> String {
    format!("x {count}")
}

fn boss_label(current: u32, max: u32) -> String {
    format!("BOSS {current}/{max}")
}

fn hud_text(label: String, size: f32) -> (Text, TextFont, TextColor) {
    (
        Text::new(label),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(Color::WHITE),
    )
}

/// Builds the in-stage HUD. `boss` is `(current, max)` for boss scenes.
pub fn spawn_hud(commands: &mut Commands, health: u32, count: u32, boss: Option<(u32, u32)>) {
    // Status row along the top edge
    commands
        .spawn((
            SceneEntity,
            Node {
                width: Val::Percent(100.0),
                padding: UiRect::all(Val::Px(16.0)),
                column_gap: Val::Px(32.0),
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((HealthText, hud_text(health_label(health), 32.0)));
            parent.spawn((ResourceCountText, hud_text(count_label(count), 32.0)));
            if let Some((current, max)) = boss {
                parent.spawn((BossHealthText, hud_text(boss_label(current, max), 32.0)));
            }
        });

    // Full-screen end panel, hidden until the stage is over
    commands
        .spawn((
            SceneEntity,
            EndPanelNode,
            Visibility::Hidden,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
        ))
        .with_children(|parent| {
            parent.spawn((
                EndPanelText,
                hud_text(String::new(), 72.0),
                TextLayout::new_with_justify(Justify::Center),
            ));
        });

    commands
        .spawn((
            SceneEntity,
            SettingsPanel,
            Visibility::Hidden,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((
                hud_text("PAUSED\nEsc: resume".to_string(), 64.0),
                TextLayout::new_with_justify(Justify::Center),
            ));
        });
}

// ── Observers ───────────────────────────────────────────────────────────────

fn on_health_changed(event: On<HealthChanged>, mut texts: Query<&mut Text, With<HealthText>>) {
    let Ok(mut text) = texts.single_mut() else {
        debug!("No health display; skipping update to {}", event.0);
        return;
    };
    text.0 = health_label(event.0);
}

fn on_resource_count_changed(
    event: On<ResourceCountChanged>,
    mut texts: Query<&mut Text, With<ResourceCountText>>,
) {
    let Ok(mut text) = texts.single_mut() else {
        debug!("No item counter; skipping update to {}", event.0);
        return;
    };
    text.0 = count_label(event.0);
}

fn on_boss_health_changed(
    event: On<BossHealthChanged>,
    mut texts: Query<&mut Text, With<BossHealthText>>,
) {
    let Ok(mut text) = texts.single_mut() else {
        debug!("No boss health bar; skipping update");
        return;
    };
    text.0 = boss_label(event.current, event.max);
}

fn on_show_end_panel(
    event: On<ShowEndPanel>,
    mut panels: Query<&mut Visibility, With<EndPanelNode>>,
    mut texts: Query<&mut Text, With<EndPanelText>>,
) {
    let Ok(mut visibility) = panels.single_mut() else {
        debug!("No end panel to show for {:?}", event.0);
        return;
    };
    *visibility = Visibility::Visible;
    if let Ok(mut text) = texts.single_mut() {
        text.0 = event.0.message().to_string();
    }
}

fn on_toggle_settings_panel(
    _event: On<ToggleSettingsPanel>,
    mut panels: Query<&mut Visibility, With<SettingsPanel>>,
) {
    let Ok(mut visibility) = panels.single_mut() else {
        debug!("No settings panel to toggle");
        return;
    };
    *visibility = match *visibility {
        Visibility::Hidden => Visibility::Visible,
        _ => Visibility::Hidden,
    };
}
