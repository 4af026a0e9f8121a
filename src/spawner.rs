use bevy::prelude::*;
use rand::{seq::SliceRandom, Rng};

use crate::{
    collision::Hitbox,
    game::SceneEntity,
    level::{level_tick_system, LevelCoordinator},
    player::{AutoWalk, Player},
    registry::{EntityRegistry, SpawnCategory},
    scroll::{Lifetime, Scroll},
};

/// Seconds a scrolled spawn lives before it is cleaned up off-screen.
const SCROLLED_LIFETIME: f32 = 10.0;
const ITEM_SPIN_DEGREES_PER_SEC: f32 = 100.0;

pub struct SpawnerPlugin;

impl Plugin for SpawnerPlugin {
    fn build(&self, app: &mut App) {
        // The end point must be applied before any spawner ticks on the same
        // frame, or a fresh spawn slips past the end-sequence clear.
        app.add_systems(
            Update,
            (spawner_tick_system, group_spawner_tick_system)
                .after(level_tick_system)
                .run_if(resource_exists::<LevelCoordinator>),
        )
        .add_observer(on_terminal_spawn);
    }
}

// ── Templates ───────────────────────────────────────────────────────────────

/// The things a spawner can instantiate.
#[derive(Component, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Enemy,
    Item,
    Tree,
    Platform,
    EndPoint,
}

impl EntityKind {
    pub fn category(self) -> SpawnCategory {
        match self {
            EntityKind::Enemy => SpawnCategory::Enemy,
            EntityKind::Item => SpawnCategory::Item,
            EntityKind::Tree => SpawnCategory::Decor,
            EntityKind::Platform => SpawnCategory::Platform,
            EntityKind::EndPoint => SpawnCategory::Terminal,
        }
    }

    /// Forward Z offset for kinds that must draw in a fixed order.
    pub fn depth_bias(self) -> f32 {
        match self {
            EntityKind::Tree => 0.1,
            _ => 0.0,
        }
    }

    pub fn size(self) -> Vec2 {
        match self {
            EntityKind::Enemy => Vec2::new(0.9, 0.9),
            EntityKind::Item => Vec2::new(0.6, 0.6),
            EntityKind::Tree => Vec2::new(1.2, 2.4),
            EntityKind::Platform => Vec2::new(1.5, 0.4),
            EntityKind::EndPoint => Vec2::new(1.0, 3.0),
        }
    }

    pub fn color(self) -> Color {
        match self {
            EntityKind::Enemy => Color::srgb(0.45, 0.25, 0.12),
            EntityKind::Item => Color::srgb(1.0, 0.8, 0.2),
            EntityKind::Tree => Color::srgb(0.2, 0.55, 0.25),
            EntityKind::Platform => Color::srgb(0.85, 0.6, 0.75),
            EntityKind::EndPoint => Color::srgb(1.0, 1.0, 1.0),
        }
    }
}

/// Draws uniformly from `[min, max]`. Reversed bounds are swapped and equal
/// bounds return that value, so a misconfigured range never panics.
pub fn uniform(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    if high - low <= f32::EPSILON {
        low
    } else {
        rng.gen_range(low..=high)
    }
}

// ── Spawner ─────────────────────────────────────────────────────────────────

/// Which part of the level a spawner feeds. The level coordinator pushes
/// difficulty intervals into `Enemy` and `Item` spawners, and fires the
/// `Terminal` spawner itself when the run time is up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpawnerRole {
    Enemy,
    Item,
    Decor,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct SpawnerConfig {
    pub min_interval: f32,
    pub max_interval: f32,
    pub templates: Vec<EntityKind>,
    pub vertical_range: (f32, f32),
}

/// What one spawn cycle decided. The caller turns it into entities.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOrder {
    Entity { kind: EntityKind, position: Vec3 },
    /// The terminal marker was picked: run the end sequence instead.
    Terminal { kind: EntityKind, position: Vec3 },
}

/// Spawns one random template on a randomized timer.
///
/// The timer accumulates frame time; once it reaches `next_delay` one spawn
/// happens, the timer goes back to exactly zero and a new delay is drawn.
/// A long frame never produces more than one spawn.
#[derive(Component, Debug, Clone)]
pub struct Spawner {
    pub role: SpawnerRole,
    config: SpawnerConfig,
    timer: f32,
    next_delay: f32,
}

impl Spawner {
    pub fn new(role: SpawnerRole, config: SpawnerConfig, rng: &mut impl Rng) -> Self {
        let next_delay = uniform(rng, config.min_interval, config.max_interval);
        Self {
            role,
            config,
            timer: 0.0,
            next_delay,
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn next_delay(&self) -> f32 {
        self.next_delay
    }

    /// Replaces the interval range and redraws the pending delay from it.
    pub fn set_intervals(&mut self, min_interval: f32, max_interval: f32, rng: &mut impl Rng) {
        self.config.min_interval = min_interval;
        self.config.max_interval = max_interval;
        self.next_delay = uniform(rng, min_interval, max_interval);
    }

    /// Advances the timer by `dt`. Does nothing at all while the run is inactive.
    pub fn tick(
        &mut self,
        dt: f32,
        active: bool,
        origin_x: f32,
        rng: &mut impl Rng,
    ) -> Option<SpawnOrder> {
        if !active {
            return None;
        }

        self.timer += dt;
        if self.timer < self.next_delay {
            return None;
        }

        let order = self.spawn_once(origin_x, rng);
        self.timer = 0.0;
        self.next_delay = uniform(rng, self.config.min_interval, self.config.max_interval);
        order
    }

    /// Picks a template and a height. Returns None with no templates configured.
    pub fn spawn_once(&self, origin_x: f32, rng: &mut impl Rng) -> Option<SpawnOrder> {
        let kind = *self.config.templates.choose(rng)?;
        let (min_y, max_y) = self.config.vertical_range;
        let position = Vec3::new(origin_x, uniform(rng, min_y, max_y), kind.depth_bias());

        Some(match kind.category() {
            SpawnCategory::Terminal => SpawnOrder::Terminal { kind, position },
            _ => SpawnOrder::Entity { kind, position },
        })
    }
}

// ── GroupSpawner ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GroupSpawnerConfig {
    pub min_interval: f32,
    pub max_interval: f32,
    pub kind: EntityKind,
    /// Inclusive bounds on how many copies one group has.
    pub count_range: (u32, u32),
    /// Horizontal distance between neighbours in a group.
    pub gap: f32,
    pub vertical_range: (f32, f32),
}

/// A row of identical entities produced by one group spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOrder {
    pub kind: EntityKind,
    pub positions: Vec<Vec3>,
}

/// Same timer rules as `Spawner`, but each spawn is a row of copies at one
/// shared height. Never produces a terminal marker.
#[derive(Component, Debug, Clone)]
pub struct GroupSpawner {
    config: GroupSpawnerConfig,
    timer: f32,
    next_delay: f32,
}

impl GroupSpawner {
    pub fn new(config: GroupSpawnerConfig, rng: &mut impl Rng) -> Self {
        let next_delay = uniform(rng, config.min_interval, config.max_interval);
        Self {
            config,
            timer: 0.0,
            next_delay,
        }
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn tick(
        &mut self,
        dt: f32,
        active: bool,
        origin_x: f32,
        rng: &mut impl Rng,
    ) -> Option<GroupOrder> {
        if !active {
            return None;
        }

        self.timer += dt;
        if self.timer < self.next_delay {
            return None;
        }

        let order = self.spawn_once(origin_x, rng);
        self.timer = 0.0;
        self.next_delay = uniform(rng, self.config.min_interval, self.config.max_interval);
        Some(order)
    }

    pub fn spawn_once(&self, origin_x: f32, rng: &mut impl Rng) -> GroupOrder {
        let (low, high) = self.config.count_range;
        let count = rng.gen_range(low.min(high)..=high.max(low));
        let (min_y, max_y) = self.config.vertical_range;
        let row_y = uniform(rng, min_y, max_y);
        let z = self.config.kind.depth_bias();

        let positions = (0..count)
            .map(|i| Vec3::new(origin_x + i as f32 * self.config.gap, row_y, z))
            .collect();

        GroupOrder {
            kind: self.config.kind,
            positions,
        }
    }
}

// ── Instantiation ───────────────────────────────────────────────────────────

/// Instantiates one template. Everything except the terminal marker scrolls
/// with the level and expires after a while.
pub fn spawn_entity(commands: &mut Commands, kind: EntityKind, position: Vec3) -> Entity {
    let mut entity = commands.spawn((
        kind,
        kind.category(),
        Sprite::from_color(kind.color(), kind.size()),
        Transform::from_translation(position),
        Hitbox::from_size(kind.size()),
        SceneEntity,
    ));

    match kind.category() {
        SpawnCategory::Item => {
            entity.insert((
                Scroll::spinning(ITEM_SPIN_DEGREES_PER_SEC),
                Lifetime::seconds(SCROLLED_LIFETIME),
            ));
        }
        SpawnCategory::Enemy | SpawnCategory::Platform | SpawnCategory::Decor => {
            entity.insert((Scroll::plain(), Lifetime::seconds(SCROLLED_LIFETIME)));
        }
        SpawnCategory::Terminal => {}
    }

    entity.id()
}

/// Carries out a spawn decision: normal kinds are instantiated, the terminal
/// marker goes through the end sequence.
pub fn dispatch_order(commands: &mut Commands, order: SpawnOrder) {
    match order {
        SpawnOrder::Entity { kind, position } => {
            spawn_entity(commands, kind, position);
        }
        SpawnOrder::Terminal { kind, position } => {
            commands.trigger(TerminalSpawn { kind, position });
        }
    }
}

pub(crate) fn spawner_tick_system(
    mut commands: Commands,
    mut spawners: Query<(&mut Spawner, &Transform)>,
    level: Res<LevelCoordinator>,
    time: Res<Time>,
) {
    let mut rng = rand::thread_rng();
    let dt = time.delta_secs();
    let active = level.is_active();

    for (mut spawner, transform) in &mut spawners {
        // The terminal spawner is fired by the level coordinator, not by its own timer.
        if spawner.role == SpawnerRole::Terminal {
            continue;
        }
        if let Some(order) = spawner.tick(dt, active, transform.translation.x, &mut rng) {
            dispatch_order(&mut commands, order);
        }
    }
}

pub(crate) fn group_spawner_tick_system(
    mut commands: Commands,
    mut spawners: Query<(&mut GroupSpawner, &Transform)>,
    level: Res<LevelCoordinator>,
    time: Res<Time>,
) {
    let mut rng = rand::thread_rng();
    let dt = time.delta_secs();
    let active = level.is_active();

    for (mut spawner, transform) in &mut spawners {
        if let Some(group) = spawner.tick(dt, active, transform.translation.x, &mut rng) {
            for position in group.positions {
                spawn_entity(&mut commands, group.kind, position);
            }
        }
    }
}

// ── End sequence ────────────────────────────────────────────────────────────

/// The terminal marker was chosen by a spawner.
#[derive(Event, Debug, Clone)]
pub struct TerminalSpawn {
    pub kind: EntityKind,
    pub position: Vec3,
}

/// Clears enemies and items, freezes the level, places the marker and sends
/// the player walking toward it.
///
/// The level's end-sequence latch makes this one-shot: a second trigger in
/// the same level instance does nothing.
pub fn on_terminal_spawn(
    event: On<TerminalSpawn>,
    mut commands: Commands,
    level: Option<ResMut<LevelCoordinator>>,
    registry: Res<EntityRegistry>,
    players: Query<Entity, With<Player>>,
) {
    let Some(mut level) = level else {
        warn!("Terminal spawn outside of a run level; ignoring");
        return;
    };
    if !level.initiate_end_sequence() {
        debug!("End sequence already running; ignoring repeated terminal spawn");
        return;
    }

    for category in [SpawnCategory::Enemy, SpawnCategory::Item] {
        for entity in registry.members(category) {
            commands.entity(entity).try_despawn();
        }
    }

    let marker = spawn_entity(&mut commands, event.kind, event.position);
    info!("End point spawned at {:?}", event.position);

    match players.iter().next() {
        Some(player) => {
            commands.entity(player).insert(AutoWalk::toward(marker));
        }
        None => warn!("No player to walk to the end point"),
    }
}
