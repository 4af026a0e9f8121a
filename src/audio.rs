use std::collections::HashMap;

use bevy::{
    audio::{AudioSinkPlayback, Volume},
    prelude::*,
};

use crate::game::GameCoordinator;

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioMixer>()
            .add_systems(Startup, (setup_audio, start_background_music).chain())
            .add_observer(on_play_sfx)
            .add_observer(on_mute_music)
            .add_observer(on_mute_effects);
    }
}

/// Every one-shot sound the game plays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SfxId {
    ItemGet,
    Collision,
    GameOver,
    ButtonClick,
    Jump,
    Attack,
}

impl SfxId {
    pub const ALL: [SfxId; 6] = [
        SfxId::ItemGet,
        SfxId::Collision,
        SfxId::GameOver,
        SfxId::ButtonClick,
        SfxId::Jump,
        SfxId::Attack,
    ];

    fn asset_path(self) -> &'static str {
        match self {
            SfxId::ItemGet => "audio/item_get.wav",
            SfxId::Collision => "audio/collision.wav",
            SfxId::GameOver => "audio/game_over.wav",
            SfxId::ButtonClick => "audio/button_click.wav",
            SfxId::Jump => "audio/jump.wav",
            SfxId::Attack => "audio/attack.wav",
        }
    }
}

/// Handle<T> is Bevy's way of referencing assets; loading happens in the
/// background and a clip that never loads simply stays silent.
#[derive(Resource)]
pub struct GameAudio {
    pub effects: HashMap<SfxId, Handle<AudioSource>>,
    pub background_music: Handle<AudioSource>,
}

/// Current mute state of the two channels.
#[derive(Resource, Default, Debug)]
pub struct AudioMixer {
    pub music_muted: bool,
    pub effects_muted: bool,
}

/// Marker for the looping background track. It is not a `SceneEntity`, so
/// it keeps playing across scene changes.
#[derive(Component)]
pub struct BackgroundMusic;

#[derive(Event)]
pub struct PlaySfx(pub SfxId);

#[derive(Event)]
pub struct MuteMusic(pub bool);

#[derive(Event)]
pub struct MuteEffects(pub bool);

pub fn setup_audio(mut commands: Commands, asset_server: Res<AssetServer>) {
    let effects = SfxId::ALL
        .into_iter()
        .map(|id| (id, asset_server.load(id.asset_path())))
        .collect();

    commands.insert_resource(GameAudio {
        effects,
        background_music: asset_server.load("audio/bgm.mp3"),
    });
}

fn start_background_music(
    mut commands: Commands,
    audio: Res<GameAudio>,
    coordinator: Option<Res<GameCoordinator>>,
    mut mixer: ResMut<AudioMixer>,
) {
    if let Some(coordinator) = coordinator {
        mixer.music_muted = !coordinator.settings.music_on;
        mixer.effects_muted = !coordinator.settings.sound_on;
    }

    let volume = if mixer.music_muted {
        Volume::Linear(0.0)
    } else {
        Volume::Linear(1.0)
    };

    commands.spawn((
        BackgroundMusic,
        AudioPlayer::new(audio.background_music.clone()),
        PlaybackSettings::LOOP.with_volume(volume),
    ));
}

fn on_play_sfx(
    event: On<PlaySfx>,
    mut commands: Commands,
    audio: Option<Res<GameAudio>>,
    mixer: Res<AudioMixer>,
) {
    if mixer.effects_muted {
        return;
    }
    let Some(audio) = audio else {
        debug!("No audio loaded; skipping {:?}", event.0);
        return;
    };
    if let Some(clip) = audio.effects.get(&event.0) {
        // DESPAWN removes the player entity once the clip finishes.
        commands.spawn((AudioPlayer::new(clip.clone()), PlaybackSettings::DESPAWN));
    }
}

fn on_mute_music(
    event: On<MuteMusic>,
    mut mixer: ResMut<AudioMixer>,
    mut sinks: Query<&mut AudioSink, With<BackgroundMusic>>,
) {
    mixer.music_muted = event.0;
    let volume = if event.0 {
        Volume::Linear(0.0)
    } else {
        Volume::Linear(1.0)
    };
    // The sink only exists once the track has started playing.
    for mut sink in &mut sinks {
        sink.set_volume(volume);
    }
    info!("Music {}", if event.0 { "muted" } else { "on" });
}

fn on_mute_effects(event: On<MuteEffects>, mut mixer: ResMut<AudioMixer>) {
    mixer.effects_muted = event.0;
    info!("Sound effects {}", if event.0 { "muted" } else { "on" });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Default)]
    struct Played(usize);

    fn count_players(_add: On<Add, AudioPlayer>, mut played: ResMut<Played>) {
        played.0 += 1;
    }

    fn audio_world() -> World {
        let mut world = World::new();
        world.init_resource::<AudioMixer>();
        world.init_resource::<Played>();
        world.add_observer(on_play_sfx);
        world.add_observer(on_mute_effects);
        world.add_observer(count_players);
        world
    }

    #[test]
    fn missing_audio_resource_is_skipped() {
        let mut world = audio_world();
        world.trigger(PlaySfx(SfxId::Jump));
        world.flush();
        assert_eq!(world.resource::<Played>().0, 0);
    }

    #[test]
    fn missing_clip_is_skipped_and_present_clip_plays() {
        let mut world = audio_world();
        let mut effects = HashMap::new();
        effects.insert(SfxId::ItemGet, Handle::<AudioSource>::default());
        world.insert_resource(GameAudio {
            effects,
            background_music: Handle::default(),
        });

        world.trigger(PlaySfx(SfxId::Collision));
        world.flush();
        assert_eq!(world.resource::<Played>().0, 0);

        world.trigger(PlaySfx(SfxId::ItemGet));
        world.flush();
        assert_eq!(world.resource::<Played>().0, 1);
    }

    #[test]
    fn muted_effects_stay_silent() {
        let mut world = audio_world();
        let mut effects = HashMap::new();
        effects.insert(SfxId::ItemGet, Handle::<AudioSource>::default());
        world.insert_resource(GameAudio {
            effects,
            background_music: Handle::default(),
        });

        world.trigger(MuteEffects(true));
        world.trigger(PlaySfx(SfxId::ItemGet));
        world.flush();
        assert_eq!(world.resource::<Played>().0, 0);
        assert!(world.resource::<AudioMixer>().effects_muted);
    }
}
