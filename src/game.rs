use bevy::prelude::*;

use crate::{
    audio::{PlaySfx, SfxId},
    difficulty::Difficulty,
    hud::{EndPanel, ShowEndPanel, ToggleSettingsPanel},
    level::LevelCoordinator,
    settings::{self, AudioSettings},
};

/// World units to screen pixels. The camera is scaled by the inverse, so
/// gameplay code can think in units (a jump of 4, a scroll speed of 9).
pub const PIXELS_PER_UNIT: f32 = 64.0;

pub const PLAYER_MAX_HEALTH: u32 = 3;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<SceneId>()
            .add_systems(PreStartup, setup_game_coordinator)
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    pause_input_system.run_if(in_play_scene),
                    end_panel_input_system.run_if(in_play_scene),
                ),
            )
            .add_observer(on_level_complete)
            .add_observer(on_player_died)
            .add_observer(on_toggle_pause)
            .add_observer(on_load_scene);

        for scene in SceneId::ALL {
            app.add_systems(OnExit(scene), despawn_scene_entities);
        }
    }
}

// ── Scenes ──────────────────────────────────────────────────────────────────

/// Every scene the game can be in. Bevy drives `OnEnter`/`OnExit` schedules
/// off this state, which is where each scene builds and tears down its world.
#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SceneId {
    #[default]
    MainMenu,
    ChocoRun,
    StrawberryRun,
    BananaRun,
    ChocoBoss,
    StrawberryBoss,
    BananaBoss,
}

impl SceneId {
    pub const ALL: [SceneId; 7] = [
        SceneId::MainMenu,
        SceneId::ChocoRun,
        SceneId::StrawberryRun,
        SceneId::BananaRun,
        SceneId::ChocoBoss,
        SceneId::StrawberryBoss,
        SceneId::BananaBoss,
    ];

    pub const RUNS: [SceneId; 3] = [SceneId::ChocoRun, SceneId::StrawberryRun, SceneId::BananaRun];

    pub const BOSSES: [SceneId; 3] = [
        SceneId::ChocoBoss,
        SceneId::StrawberryBoss,
        SceneId::BananaBoss,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneId::MainMenu => "MainUI",
            SceneId::ChocoRun => "Choco_Run",
            SceneId::StrawberryRun => "StrawBerry_Run",
            SceneId::BananaRun => "BANANA_Run",
            SceneId::ChocoBoss => "Choco_Boss",
            SceneId::StrawberryBoss => "StrawBerry_Boss",
            SceneId::BananaBoss => "BANANA_Boss",
        }
    }

    pub fn from_name(name: &str) -> Option<SceneId> {
        SceneId::ALL.into_iter().find(|scene| scene.name() == name)
    }

    pub fn is_run(self) -> bool {
        SceneId::RUNS.contains(&self)
    }

    pub fn is_boss(self) -> bool {
        SceneId::BOSSES.contains(&self)
    }

    /// The boss fight that follows a run stage.
    pub fn boss_for(self) -> Option<SceneId> {
        match self {
            SceneId::ChocoRun => Some(SceneId::ChocoBoss),
            SceneId::StrawberryRun => Some(SceneId::StrawberryBoss),
            SceneId::BananaRun => Some(SceneId::BananaBoss),
            _ => None,
        }
    }

    /// The run stage that leads into a boss fight.
    pub fn run_for(self) -> Option<SceneId> {
        match self {
            SceneId::ChocoBoss => Some(SceneId::ChocoRun),
            SceneId::StrawberryBoss => Some(SceneId::StrawberryRun),
            SceneId::BananaBoss => Some(SceneId::BananaRun),
            _ => None,
        }
    }

    /// Where "retry" goes: a run restarts itself, a boss restarts its run.
    pub fn retry_target(self) -> SceneId {
        if self.is_boss() {
            self.run_for().unwrap_or(SceneId::MainMenu)
        } else {
            self
        }
    }

    pub fn difficulty(self) -> Option<Difficulty> {
        match self {
            SceneId::ChocoRun | SceneId::ChocoBoss => Some(Difficulty::VeryEasy),
            SceneId::StrawberryRun | SceneId::StrawberryBoss => Some(Difficulty::Easy),
            SceneId::BananaRun | SceneId::BananaBoss => Some(Difficulty::Normal),
            SceneId::MainMenu => None,
        }
    }
}

/// Run condition: true in any run or boss scene.
pub fn in_play_scene(scene: Res<State<SceneId>>) -> bool {
    let scene = *scene.get();
    scene.is_run() || scene.is_boss()
}

/// Run condition: false while the player has the game paused. Player input
/// must not queue jumps or shots behind the pause panel.
pub fn gameplay_unpaused(coordinator: Option<Res<GameCoordinator>>) -> bool {
    coordinator.is_none_or(|coordinator| !coordinator.is_paused())
}

/// Marker for everything that belongs to the current scene. Despawned on exit.
#[derive(Component)]
pub struct SceneEntity;

fn despawn_scene_entities(mut commands: Commands, query: Query<Entity, With<SceneEntity>>) {
    for entity in &query {
        commands.entity(entity).try_despawn();
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Transform::from_scale(Vec3::splat(1.0 / PIXELS_PER_UNIT)),
    ));
}

// ── GameCoordinator ─────────────────────────────────────────────────────────

/// State that outlives any single scene: audio toggles, the items carried
/// from a run into its boss fight, the player's health, and the pause flag.
///
/// Inserted once before startup and never removed. It is the only writer of
/// its own fields; everyone else goes through these methods.
#[derive(Resource, Debug)]
pub struct GameCoordinator {
    pub settings: AudioSettings,
    collected_count: u32,
    player_health: u32,
    max_health: u32,
    paused: bool,
    game_over: bool,
    stage_cleared: bool,
}

impl GameCoordinator {
    pub fn new(settings: AudioSettings) -> Self {
        Self {
            settings,
            collected_count: 0,
            player_health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            paused: false,
            game_over: false,
            stage_cleared: false,
        }
    }

    pub fn collected_count(&self) -> u32 {
        self.collected_count
    }

    pub fn player_health(&self) -> u32 {
        self.player_health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_stage_cleared(&self) -> bool {
        self.stage_cleared
    }

    /// A stage is (re)started from the menu or a retry: nothing carries over.
    pub fn start_stage(&mut self) {
        self.collected_count = 0;
        self.player_health = self.max_health;
        self.paused = false;
        self.game_over = false;
        self.stage_cleared = false;
    }

    /// Records the items collected on a run and picks the boss scene that
    /// follows it. Returns `None` if `current` is not a run stage.
    pub fn on_level_complete(&mut self, collected: u32, current: SceneId) -> Option<SceneId> {
        self.collected_count = collected;
        current.boss_for()
    }

    /// Applies damage and returns the remaining health.
    pub fn damage_player(&mut self, amount: u32) -> u32 {
        self.player_health = self.player_health.saturating_sub(amount);
        self.player_health
    }

    /// Health goes back to max so a retry starts fresh.
    pub fn on_player_died(&mut self) {
        self.player_health = self.max_health;
        self.game_over = true;
    }

    pub fn on_stage_cleared(&mut self) {
        self.stage_cleared = true;
    }

    /// Flips the pause flag and returns the new value. Once the game is over
    /// or the stage is cleared the end panel owns the screen, so this is a
    /// no-op that returns `None`.
    pub fn toggle_pause(&mut self) -> Option<bool> {
        if self.game_over || self.stage_cleared {
            return None;
        }
        self.paused = !self.paused;
        Some(self.paused)
    }

    pub fn toggle_music(&mut self) -> bool {
        self.settings.music_on = !self.settings.music_on;
        self.settings.music_on
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.settings.sound_on = !self.settings.sound_on;
        self.settings.sound_on
    }

    pub fn toggle_mic(&mut self) -> bool {
        self.settings.mic_on = !self.settings.mic_on;
        self.settings.mic_on
    }
}

fn setup_game_coordinator(mut commands: Commands) {
    let audio_settings = settings::load_settings();
    commands.insert_resource(GameCoordinator::new(audio_settings));
}

// ── Events ──────────────────────────────────────────────────────────────────

/// The player touched the terminal marker.
#[derive(Event)]
pub struct LevelComplete {
    pub collected: u32,
}

/// The player's health reached zero.
#[derive(Event)]
pub struct PlayerDied;

/// Settings button / Escape.
#[derive(Event)]
pub struct TogglePause;

/// Request to switch scenes. The switch happens on the next state transition.
#[derive(Event)]
pub struct LoadScene(pub SceneId);

fn on_level_complete(
    event: On<LevelComplete>,
    mut coordinator: ResMut<GameCoordinator>,
    scene: Res<State<SceneId>>,
    mut next_scene: ResMut<NextState<SceneId>>,
    level: Option<ResMut<LevelCoordinator>>,
) {
    info!("Reached the end point with {} items", event.collected);

    if let Some(mut level) = level {
        level.end_game();
    }

    let current = *scene.get();
    match coordinator.on_level_complete(event.collected, current) {
        Some(next) => {
            info!("Moving from {} to {}", current.name(), next.name());
            next_scene.set(next);
        }
        None => warn!("{} has no boss scene to move on to", current.name()),
    }
}

fn on_player_died(
    _event: On<PlayerDied>,
    mut commands: Commands,
    mut coordinator: ResMut<GameCoordinator>,
    mut time: ResMut<Time<Virtual>>,
) {
    info!("Game over!");
    coordinator.on_player_died();

    commands.trigger(PlaySfx(SfxId::GameOver));
    commands.trigger(ShowEndPanel(EndPanel::GameOver));

    // Virtual time drives Update deltas and FixedUpdate; UI input keeps working.
    time.pause();
}

fn on_toggle_pause(
    _event: On<TogglePause>,
    mut commands: Commands,
    mut coordinator: ResMut<GameCoordinator>,
    mut time: ResMut<Time<Virtual>>,
) {
    match coordinator.toggle_pause() {
        Some(true) => time.pause(),
        Some(false) => time.unpause(),
        None => {
            debug!("Ignoring pause toggle while the end panel is up");
            return;
        }
    }
    commands.trigger(ToggleSettingsPanel);
}

fn on_load_scene(
    event: On<LoadScene>,
    mut commands: Commands,
    mut coordinator: ResMut<GameCoordinator>,
    mut next_scene: ResMut<NextState<SceneId>>,
    mut time: ResMut<Time<Virtual>>,
) {
    let target = event.0;
    commands.trigger(PlaySfx(SfxId::ButtonClick));

    if target.is_run() || target == SceneId::MainMenu {
        coordinator.start_stage();
    }

    // A previous game over or pause may have left time stopped.
    time.unpause();

    info!("Loading scene {}", target.name());
    next_scene.set(target);
}

// ── Input ───────────────────────────────────────────────────────────────────

fn pause_input_system(mut commands: Commands, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::Escape) {
        commands.trigger(TogglePause);
    }
}

/// Retry / back-to-menu once the game-over or clear panel is showing.
fn end_panel_input_system(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    coordinator: Res<GameCoordinator>,
    scene: Res<State<SceneId>>,
) {
    if !coordinator.is_game_over() && !coordinator.is_stage_cleared() {
        return;
    }

    if keys.just_pressed(KeyCode::KeyR) {
        commands.trigger(LoadScene(scene.get().retry_target()));
    } else if keys.just_pressed(KeyCode::KeyM) {
        commands.trigger(LoadScene(SceneId::MainMenu));
    }
}
