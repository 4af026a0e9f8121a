use bevy::prelude::*;

use crate::{
    difficulty::{DifficultyParams, DifficultyTable},
    game::{GameCoordinator, SceneEntity, SceneId, PLAYER_MAX_HEALTH},
    hud::spawn_hud,
    player::{spawn_runner, GROUND_Y},
    scroll::InfiniteScroller,
    spawner::{
        dispatch_order, EntityKind, GroupSpawner, GroupSpawnerConfig, Spawner, SpawnerConfig,
        SpawnerRole,
    },
};

/// Spawners sit just past the right edge of the view.
const SPAWN_X: f32 = 11.0;
const BACKGROUND_WIDTH: f32 = 20.0;

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            level_tick_system.run_if(resource_exists::<LevelCoordinator>),
        );

        for scene in SceneId::RUNS {
            app.add_systems(OnEnter(scene), (setup_level, configure_spawners).chain())
                .add_systems(OnExit(scene), teardown_level);
        }
    }
}

/// Run state of one level instance.
///
/// Lives exactly as long as the run scene: inserted on enter, removed on
/// exit, so every latch here is fresh for each attempt. Only the methods
/// below write to it; movers and spawners poll `is_active` and
/// `scroll_speed` every frame.
#[derive(Resource, Debug, Clone)]
pub struct LevelCoordinator {
    difficulty_index: usize,
    params: DifficultyParams,
    elapsed: f32,
    scroll_speed: f32,
    active: bool,
    terminal_spawned: bool,
    end_sequence_started: bool,
}

impl LevelCoordinator {
    pub fn start(difficulty_index: usize, table: &DifficultyTable) -> Self {
        let params = table.lookup(difficulty_index);
        info!(
            "Level started: difficulty {}, speed {}, end point at {}s",
            difficulty_index, params.scroll_speed, params.terminal_time
        );
        Self {
            difficulty_index,
            params,
            elapsed: 0.0,
            scroll_speed: params.scroll_speed,
            active: true,
            terminal_spawned: false,
            end_sequence_started: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn scroll_speed(&self) -> f32 {
        self.scroll_speed
    }

    pub fn difficulty_index(&self) -> usize {
        self.difficulty_index
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    pub fn terminal_spawned(&self) -> bool {
        self.terminal_spawned
    }

    pub fn enemy_intervals(&self) -> (f32, f32) {
        (self.params.min_enemy_interval, self.params.max_enemy_interval)
    }

    pub fn item_intervals(&self) -> (f32, f32) {
        (self.params.min_item_interval, self.params.max_item_interval)
    }

    /// Advances the run clock. Returns true on the one frame where the end
    /// point should be spawned; never again for this level instance.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }

        self.elapsed += dt;
        if self.elapsed >= self.params.terminal_time && !self.terminal_spawned {
            self.terminal_spawned = true;
            return true;
        }
        false
    }

    /// Stops spawning. Scrolling keeps its speed.
    pub fn end_game(&mut self) {
        self.active = false;
    }

    /// Stops spawning and scrolling for the walk to the end point.
    ///
    /// Returns false if the sequence was already started, in which case
    /// nothing changes.
    pub fn initiate_end_sequence(&mut self) -> bool {
        if self.end_sequence_started {
            return false;
        }
        self.end_sequence_started = true;
        self.terminal_spawned = true;
        self.active = false;
        self.scroll_speed = 0.0;
        info!("End sequence started after {:.1}s", self.elapsed);
        true
    }

    /// Pushes this level's intervals into a spawner. Roles without a
    /// difficulty column keep their own intervals.
    pub fn configure(&self, spawner: &mut Spawner, rng: &mut impl rand::Rng) {
        let (min, max) = match spawner.role {
            SpawnerRole::Enemy => self.enemy_intervals(),
            SpawnerRole::Item => self.item_intervals(),
            SpawnerRole::Decor | SpawnerRole::Terminal => return,
        };
        spawner.set_intervals(min, max, rng);
    }
}

fn setup_level(
    mut commands: Commands,
    scene: Res<State<SceneId>>,
    table: Res<DifficultyTable>,
    coordinator: Option<Res<GameCoordinator>>,
) {
    let scene = *scene.get();
    let difficulty = scene.difficulty().unwrap_or_default();
    let level = LevelCoordinator::start(difficulty.index(), &table);
    let jump = level.params().jump;
    commands.insert_resource(level);

    let mut rng = rand::thread_rng();
    let spawner_at = |y: f32| (Transform::from_xyz(SPAWN_X, y, 0.0), SceneEntity);
    // Template heights sit on the ground line.
    let on_ground = |kind: EntityKind| GROUND_Y + kind.size().y / 2.0;

    commands.spawn((
        Spawner::new(
            SpawnerRole::Enemy,
            SpawnerConfig {
                min_interval: 2.0,
                max_interval: 3.5,
                templates: vec![EntityKind::Enemy],
                vertical_range: (on_ground(EntityKind::Enemy), on_ground(EntityKind::Enemy)),
            },
            &mut rng,
        ),
        spawner_at(0.0),
    ));
    commands.spawn((
        Spawner::new(
            SpawnerRole::Item,
            SpawnerConfig {
                min_interval: 3.0,
                max_interval: 6.0,
                templates: vec![EntityKind::Item],
                vertical_range: (GROUND_Y + 1.0, GROUND_Y + 4.5),
            },
            &mut rng,
        ),
        spawner_at(0.0),
    ));
    commands.spawn((
        Spawner::new(
            SpawnerRole::Decor,
            SpawnerConfig {
                min_interval: 2.0,
                max_interval: 4.0,
                templates: vec![EntityKind::Tree],
                vertical_range: (on_ground(EntityKind::Tree), on_ground(EntityKind::Tree)),
            },
            &mut rng,
        ),
        spawner_at(0.0),
    ));
    commands.spawn((
        Spawner::new(
            SpawnerRole::Terminal,
            SpawnerConfig {
                min_interval: 0.0,
                max_interval: 0.0,
                templates: vec![EntityKind::EndPoint],
                vertical_range: (on_ground(EntityKind::EndPoint), on_ground(EntityKind::EndPoint)),
            },
            &mut rng,
        ),
        spawner_at(0.0),
    ));
    commands.spawn((
        GroupSpawner::new(
            GroupSpawnerConfig {
                min_interval: 3.0,
                max_interval: 5.0,
                kind: EntityKind::Platform,
                count_range: (3, 4),
                gap: 1.5,
                vertical_range: (-1.0, 2.0),
            },
            &mut rng,
        ),
        spawner_at(0.0),
    ));

    spawn_backdrop(&mut commands);
    spawn_runner(&mut commands, jump);

    let health = coordinator.map_or(PLAYER_MAX_HEALTH, |c| c.player_health());
    spawn_hud(&mut commands, health, 0, None);

    info!("Entered {}", scene.name());
}

/// Runs after `setup_level` has been applied, so the spawners exist.
fn configure_spawners(level: Res<LevelCoordinator>, mut spawners: Query<&mut Spawner>) {
    let mut rng = rand::thread_rng();
    for mut spawner in &mut spawners {
        level.configure(&mut spawner, &mut rng);
    }
}

fn spawn_backdrop(commands: &mut Commands) {
    let sky = [Color::srgb(0.55, 0.35, 0.25), Color::srgb(0.6, 0.38, 0.27)];
    for (i, color) in sky.into_iter().enumerate() {
        commands.spawn((
            Sprite::from_color(color, Vec2::new(BACKGROUND_WIDTH, 12.0)),
            Transform::from_xyz(i as f32 * BACKGROUND_WIDTH, 0.0, -10.0),
            InfiniteScroller {
                width: BACKGROUND_WIDTH,
                speed_multiplier: 0.3,
            },
            SceneEntity,
        ));
    }

    commands.spawn((
        Sprite::from_color(Color::srgb(0.3, 0.18, 0.1), Vec2::new(BACKGROUND_WIDTH * 2.0, 3.0)),
        Transform::from_xyz(0.0, GROUND_Y - 1.5, -1.0),
        SceneEntity,
    ));
}

/// Advances the run clock and fires the terminal spawner once time is up.
pub(crate) fn level_tick_system(
    mut commands: Commands,
    mut level: ResMut<LevelCoordinator>,
    spawners: Query<(&Spawner, &Transform)>,
    time: Res<Time>,
) {
    if !level.tick(time.delta_secs()) {
        return;
    }

    let mut rng = rand::thread_rng();
    let terminal = spawners
        .iter()
        .find(|(spawner, _)| spawner.role == SpawnerRole::Terminal);

    match terminal.and_then(|(spawner, transform)| spawner.spawn_once(transform.translation.x, &mut rng)) {
        Some(order) => dispatch_order(&mut commands, order),
        None => {
            // Nothing to walk to: stop the level here instead of running forever.
            warn!("Run time is up but there is no end point spawner");
            level.initiate_end_sequence();
        }
    }
}

fn teardown_level(mut commands: Commands) {
    commands.remove_resource::<LevelCoordinator>();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::ecs::system::RunSystemOnce;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        difficulty::Difficulty,
        player::{AutoWalk, Player},
        registry::{
            deregister_despawned, register_spawned, EntityRegistry, RegistryPlugin, SpawnCategory,
        },
        spawner::{on_terminal_spawn, spawner_tick_system, SpawnerPlugin},
    };

    fn normal_level() -> LevelCoordinator {
        LevelCoordinator::start(Difficulty::Normal.index(), &DifficultyTable::default())
    }

    #[test]
    fn start_resolves_the_difficulty_row() {
        let level = normal_level();
        assert!(level.is_active());
        assert_eq!(level.scroll_speed(), 9.0);
        assert_eq!(level.enemy_intervals(), (2.0, 3.5));
        assert_eq!(level.item_intervals(), (3.0, 6.0));
        assert_eq!(level.elapsed(), 0.0);
        assert!(!level.terminal_spawned());
    }

    #[test]
    fn terminal_fires_exactly_once() {
        let mut level = normal_level();
        assert!(!level.tick(100.0));
        assert!(level.tick(50.0));
        assert!(!level.tick(50.0));
        assert!(!level.tick(1000.0));
    }

    #[test]
    fn end_game_keeps_scrolling_but_stops_the_clock() {
        let mut level = normal_level();
        level.tick(10.0);
        level.end_game();
        assert!(!level.is_active());
        assert_eq!(level.scroll_speed(), 9.0);
        assert!(!level.tick(500.0));
        assert_eq!(level.elapsed(), 10.0);
    }

    #[test]
    fn end_sequence_is_latched() {
        let mut level = normal_level();
        assert!(level.initiate_end_sequence());
        assert_eq!(level.scroll_speed(), 0.0);
        assert!(!level.initiate_end_sequence());
        // Reaching the end sequence some other way still counts as spawned.
        assert!(level.terminal_spawned());
    }

    #[test]
    fn configure_pushes_intervals_by_role() {
        let mut rng = StdRng::seed_from_u64(7);
        let level = normal_level();
        let config = |min: f32, max: f32| SpawnerConfig {
            min_interval: min,
            max_interval: max,
            templates: vec![EntityKind::Enemy],
            vertical_range: (0.0, 0.0),
        };

        let mut enemy = Spawner::new(SpawnerRole::Enemy, config(50.0, 60.0), &mut rng);
        let mut decor = Spawner::new(SpawnerRole::Decor, config(50.0, 60.0), &mut rng);
        level.configure(&mut enemy, &mut rng);
        level.configure(&mut decor, &mut rng);

        assert_eq!(enemy.config().min_interval, 2.0);
        assert_eq!(enemy.config().max_interval, 3.5);
        assert!((2.0..=3.5).contains(&enemy.next_delay()));
        assert_eq!(decor.config().min_interval, 50.0);
    }

    // ── Full run on a bare World ────────────────────────────────────────────

    fn spawn_run_entities(world: &mut World, enemy_interval: f32) {
        let mut rng = StdRng::seed_from_u64(3);
        world.spawn((
            Spawner::new(
                SpawnerRole::Enemy,
                SpawnerConfig {
                    min_interval: enemy_interval,
                    max_interval: enemy_interval,
                    templates: vec![EntityKind::Enemy],
                    vertical_range: (0.0, 0.0),
                },
                &mut rng,
            ),
            Transform::from_xyz(SPAWN_X, 0.0, 0.0),
        ));
        world.spawn((
            Spawner::new(
                SpawnerRole::Terminal,
                SpawnerConfig {
                    min_interval: 0.0,
                    max_interval: 0.0,
                    templates: vec![EntityKind::EndPoint],
                    vertical_range: (0.0, 0.0),
                },
                &mut rng,
            ),
            Transform::from_xyz(SPAWN_X, 0.0, 0.0),
        ));
        world.spawn(Player::runner());
    }

    fn run_world() -> World {
        let mut world = World::new();
        world.insert_resource(normal_level());
        world.insert_resource(Time::<()>::default());
        world.init_resource::<EntityRegistry>();
        world.add_observer(register_spawned);
        world.add_observer(deregister_despawned);
        world.add_observer(on_terminal_spawn);
        spawn_run_entities(&mut world, 1.0);
        world
    }

    /// The level, spawner and registry plugins wired into one `Update`
    /// schedule, with time stepped by hand.
    fn run_app(enemy_interval: f32) -> App {
        let mut app = App::new();
        app.add_plugins((RegistryPlugin, LevelPlugin, SpawnerPlugin));
        app.insert_resource(normal_level());
        app.insert_resource(Time::<()>::default());
        spawn_run_entities(app.world_mut(), enemy_interval);
        app
    }

    fn frame(world: &mut World, dt: f32) {
        world
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(dt));
        world
            .run_system_once(level_tick_system)
            .expect("level tick runs");
        world
            .run_system_once(spawner_tick_system)
            .expect("spawner tick runs");
        world.flush();
    }

    fn terminals(world: &World) -> usize {
        world.resource::<EntityRegistry>().count(SpawnCategory::Terminal)
    }

    #[test]
    fn normal_run_ends_once_after_its_terminal_time() {
        let mut world = run_world();

        frame(&mut world, 50.0);
        frame(&mut world, 50.0);
        assert_eq!(terminals(&world), 0);
        assert_eq!(world.resource::<EntityRegistry>().count(SpawnCategory::Enemy), 2);

        frame(&mut world, 50.0);
        assert_eq!(terminals(&world), 1);
        assert_eq!(world.resource::<EntityRegistry>().count(SpawnCategory::Enemy), 0);
        assert_eq!(world.resource::<LevelCoordinator>().scroll_speed(), 0.0);

        frame(&mut world, 50.0);
        let registry = world.resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Terminal), 1);
        assert_eq!(registry.count(SpawnCategory::Enemy), 0);
        assert_eq!(registry.count(SpawnCategory::Item), 0);

        let walkers = world
            .query_filtered::<Entity, With<AutoWalk>>()
            .iter(&world)
            .count();
        assert_eq!(walkers, 1);
    }

    #[test]
    fn missing_terminal_spawner_still_ends_the_level() {
        let mut world = World::new();
        world.insert_resource(normal_level());
        world.insert_resource(Time::<()>::default());
        world.init_resource::<EntityRegistry>();

        frame(&mut world, 200.0);
        let level = world.resource::<LevelCoordinator>();
        assert!(!level.is_active());
        assert_eq!(level.scroll_speed(), 0.0);
    }

    #[test]
    fn spawn_due_on_the_end_frame_is_suppressed() {
        // The enemy timer and the run clock both run out on the same frame.
        let mut app = run_app(150.0);
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(150.0));
        app.update();

        let world = app.world();
        let registry = world.resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Terminal), 1);
        assert_eq!(registry.count(SpawnCategory::Enemy), 0);
        assert!(!world.resource::<LevelCoordinator>().is_active());
        assert_eq!(world.resource::<LevelCoordinator>().scroll_speed(), 0.0);
    }

    #[test]
    fn scheduled_run_spawns_until_the_end_point() {
        let mut app = run_app(1.0);
        let step = |app: &mut App| {
            app.world_mut()
                .resource_mut::<Time>()
                .advance_by(Duration::from_secs_f32(50.0));
            app.update();
        };

        step(&mut app);
        step(&mut app);
        let registry = app.world().resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Enemy), 2);
        assert_eq!(registry.count(SpawnCategory::Terminal), 0);

        step(&mut app);
        let registry = app.world().resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Terminal), 1);
        assert_eq!(registry.count(SpawnCategory::Enemy), 0);
    }
}
