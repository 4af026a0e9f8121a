use bevy::{log::LogPlugin, prelude::*};

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Dessert Dash".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: "info,wgpu=error,naga=warn,dessert_dash=debug".into(),
                    ..default()
                }),
        )
        .add_plugins((
            game::GamePlugin,
            difficulty::DifficultyPlugin,
            registry::RegistryPlugin,
            audio::AudioPlugin,
            hud::HudPlugin,
            menu::MenuPlugin,
        ))
        .add_plugins((
            level::LevelPlugin,
            spawner::SpawnerPlugin,
            scroll::ScrollPlugin,
            player::PlayerPlugin,
            collision::CollisionPlugin,
            effects::EffectsPlugin,
            boss::BossPlugin,
        ))
        .run();
}

mod audio;
mod boss;
mod collision;
mod difficulty;
mod effects;
mod game;
mod hud;
mod level;
mod menu;
mod player;
mod registry;
mod scroll;
mod settings;
mod spawner;
