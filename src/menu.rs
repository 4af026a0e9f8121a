use bevy::prelude::*;

use crate::{
    audio::{MuteEffects, MuteMusic, PlaySfx, SfxId},
    game::{GameCoordinator, LoadScene, SceneEntity, SceneId},
    settings::{self, AudioSettings},
};

const TUTORIAL_PAGES: [&str; 3] = [
    "Space / Up: jump over the chocolate blobs\nGrab the candies on the way",
    "Reach the end flag with as many candies as you can\nEvery candy is one shot at the boss",
    "Boss fight: A/D to move, Space to jump, Z to fire\nBreak the tower before you run out!",
];

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(SceneId::MainMenu), spawn_menu_ui)
            .add_systems(
                Update,
                (stage_select_system, settings_toggle_system, tutorial_system)
                    .run_if(in_state(SceneId::MainMenu)),
            );
    }
}

#[derive(Component)]
pub struct SettingsStatusText;

#[derive(Component)]
pub struct TutorialPanel;

#[derive(Component)]
pub struct TutorialText;

/// Tutorial page state. Any requested page is clamped into range, and
/// next/previous wrap around the ends.
#[derive(Component, Debug)]
pub struct TutorialPager {
    pages: usize,
    current: usize,
    open: bool,
}

impl TutorialPager {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            current: 0,
            open: false,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Opening always starts at the first page. Returns the new open state.
    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        if self.open {
            self.show(0);
        }
        self.open
    }

    pub fn show(&mut self, index: isize) {
        if self.pages == 0 {
            return;
        }
        self.current = index.clamp(0, self.pages as isize - 1) as usize;
    }

    pub fn next(&mut self) {
        if self.pages == 0 {
            return;
        }
        self.show(((self.current + 1) % self.pages) as isize);
    }

    pub fn previous(&mut self) {
        if self.pages == 0 {
            return;
        }
        self.show(((self.current + self.pages - 1) % self.pages) as isize);
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn settings_label(settings: &AudioSettings) -> String {
    format!(
        "[M] Music {}   [S] Sound {}   [V] Mic {}",
        on_off(settings.music_on),
        on_off(settings.sound_on),
        on_off(settings.mic_on)
    )
}

fn menu_text(label: impl Into<String>, size: f32) -> (Text, TextFont, TextColor) {
    (
        Text::new(label),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(Color::WHITE),
    )
}

fn spawn_menu_ui(mut commands: Commands, coordinator: Res<GameCoordinator>) {
    commands
        .spawn((
            SceneEntity,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                ..default()
            },
            BackgroundColor(Color::srgb(0.35, 0.2, 0.12)),
        ))
        .with_children(|parent| {
            parent.spawn(menu_text("DESSERT DASH", 96.0));
            parent.spawn(menu_text(
                "[1] Chocolate   [2] Strawberry   [3] Banana",
                40.0,
            ));
            parent.spawn((
                SettingsStatusText,
                menu_text(settings_label(&coordinator.settings), 28.0),
            ));
            parent.spawn(menu_text("[T] How to play", 28.0));
        });

    // Tutorial overlay, hidden until T is pressed
    commands
        .spawn((
            SceneEntity,
            TutorialPanel,
            TutorialPager::new(TUTORIAL_PAGES.len()),
            Visibility::Hidden,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.85)),
        ))
        .with_children(|parent| {
            parent.spawn((
                TutorialText,
                menu_text(TUTORIAL_PAGES[0], 36.0),
                TextLayout::new_with_justify(Justify::Center),
            ));
        });
}

fn stage_select_system(mut commands: Commands, keys: Res<ButtonInput<KeyCode>>) {
    let stage = if keys.just_pressed(KeyCode::Digit1) {
        SceneId::ChocoRun
    } else if keys.just_pressed(KeyCode::Digit2) {
        SceneId::StrawberryRun
    } else if keys.just_pressed(KeyCode::Digit3) {
        SceneId::BananaRun
    } else {
        return;
    };
    commands.trigger(LoadScene(stage));
}

fn settings_toggle_system(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    mut coordinator: ResMut<GameCoordinator>,
    mut labels: Query<&mut Text, With<SettingsStatusText>>,
) {
    if keys.just_pressed(KeyCode::KeyM) {
        let on = coordinator.toggle_music();
        commands.trigger(MuteMusic(!on));
    } else if keys.just_pressed(KeyCode::KeyS) {
        let on = coordinator.toggle_sound();
        commands.trigger(MuteEffects(!on));
    } else if keys.just_pressed(KeyCode::KeyV) {
        let on = coordinator.toggle_mic();
        info!("Microphone {}", on_off(on));
    } else {
        return;
    }

    commands.trigger(PlaySfx(SfxId::ButtonClick));
    settings::save_settings(&coordinator.settings);
    for mut text in &mut labels {
        text.0 = settings_label(&coordinator.settings);
    }
}

fn tutorial_system(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    mut panels: Query<(&mut TutorialPager, &mut Visibility), With<TutorialPanel>>,
    mut texts: Query<&mut Text, With<TutorialText>>,
) {
    let Ok((mut pager, mut visibility)) = panels.single_mut() else {
        return;
    };

    if keys.just_pressed(KeyCode::KeyT) {
        *visibility = if pager.toggle() {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    } else if pager.is_open() && keys.just_pressed(KeyCode::ArrowRight) {
        pager.next();
    } else if pager.is_open() && keys.just_pressed(KeyCode::ArrowLeft) {
        pager.previous();
    } else {
        return;
    }

    commands.trigger(PlaySfx(SfxId::ButtonClick));
    if let Ok(mut text) = texts.single_mut() {
        text.0 = TUTORIAL_PAGES[pager.current()].to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_pages_clamp_into_range() {
        let mut pager = TutorialPager::new(3);
        pager.show(7);
        assert_eq!(pager.current(), 2);
        pager.show(-4);
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn paging_wraps_around_both_ends() {
        let mut pager = TutorialPager::new(3);
        pager.previous();
        assert_eq!(pager.current(), 2);
        pager.next();
        assert_eq!(pager.current(), 0);
        pager.next();
        pager.next();
        assert_eq!(pager.current(), 2);
    }

    #[test]
    fn reopening_starts_at_the_first_page() {
        let mut pager = TutorialPager::new(3);
        assert!(pager.toggle());
        pager.next();
        assert!(!pager.toggle());
        assert!(pager.toggle());
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn an_empty_pager_stays_put() {
        let mut pager = TutorialPager::new(0);
        pager.next();
        pager.previous();
        pager.show(3);
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn settings_label_reflects_each_toggle() {
        let mut settings = AudioSettings::default();
        settings.sound_on = false;
        assert_eq!(
            settings_label(&settings),
            "[M] Music ON   [S] Sound OFF   [V] Mic ON"
        );
    }
}
