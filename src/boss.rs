use bevy::prelude::*;

use crate::{
    collision::{overlaps, Hitbox},
    difficulty::DifficultyTable,
    effects::{BlinkStyle, Invincibility},
    game::{GameCoordinator, SceneEntity, SceneId},
    hud::{spawn_hud, BossHealthChanged, EndPanel, ShowEndPanel},
    player::{spawn_boss_fighter, Player, GROUND_Y},
    registry::SpawnCategory,
    scroll::Lifetime,
};

const TOWER_SIZE: Vec2 = Vec2::new(2.0, 5.0);
const TOWER_X: f32 = 7.5;
const TOWER_COLOR: Color = Color::srgb(0.55, 0.3, 0.15);
const HIT_FLASH_SECONDS: f32 = 0.5;
const HIT_FLASH_PERIOD: f32 = 0.1;

const VOLLEY_COOLDOWN: f32 = 5.0;
const VOLLEY_COUNT: usize = 5;
const VOLLEY_SPREAD_DEGREES: f32 = 45.0;
const VOLLEY_SPEED: f32 = 8.0;

const MINION_SIZE: Vec2 = Vec2::new(0.8, 0.8);
const MINION_CHASE_SPEED: f32 = 2.0;

const PROJECTILE_LIFETIME: f32 = 3.0;
const SHOT_SPEED: f32 = 10.0;

pub struct BossPlugin;

impl Plugin for BossPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                special_attack_system,
                minion_spawn_system,
                minion_chase_system,
                velocity_system,
                shot_hit_system,
            )
                .run_if(boss_in_play),
        )
        .add_observer(on_boss_defeated);

        for scene in SceneId::BOSSES {
            app.add_systems(OnEnter(scene), setup_arena)
                .add_systems(OnExit(scene), teardown_arena);
        }
    }
}

/// Present for the duration of a boss scene.
#[derive(Resource, Debug, Default)]
pub struct BossArena {
    defeated: bool,
}

impl BossArena {
    pub fn is_defeated(&self) -> bool {
        self.defeated
    }
}

/// Run condition: a boss scene whose tower is still standing.
fn boss_in_play(arena: Option<Res<BossArena>>) -> bool {
    arena.is_some_and(|arena| !arena.is_defeated())
}

// ── Tower ───────────────────────────────────────────────────────────────────

#[derive(Component, Debug)]
pub struct BossTower {
    health: u32,
    max_health: u32,
}

impl BossTower {
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Returns the remaining health.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }
}

/// Periodic fan of projectiles aimed at the player.
#[derive(Component, Debug)]
pub struct SpecialAttack {
    cooldown: f32,
    timer: f32,
}

impl SpecialAttack {
    /// The first volley comes after a half-cooldown lead-in plus one cooldown.
    pub fn new(cooldown: f32) -> Self {
        Self {
            cooldown,
            timer: -cooldown / 2.0,
        }
    }

    /// Returns true on frames where a volley should be fired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer += dt;
        if self.timer < self.cooldown {
            return false;
        }
        self.timer = 0.0;
        true
    }
}

/// Unit directions for `count` projectiles spread evenly across
/// `spread_degrees`, centred on `aim`.
pub fn fan_directions(aim: Vec2, count: usize, spread_degrees: f32) -> Vec<Vec2> {
    let aim = aim.normalize_or(Vec2::NEG_X);
    if count <= 1 {
        return vec![aim];
    }

    let center = aim.y.atan2(aim.x);
    let spread = spread_degrees.to_radians();
    let step = spread / (count - 1) as f32;
    (0..count)
        .map(|i| Vec2::from_angle(center - spread / 2.0 + step * i as f32))
        .collect()
}

// ── Minions ─────────────────────────────────────────────────────────────────

/// Drops minions in front of the tower: after an initial delay, one check
/// per interval, skipped while too many are alive, and never more than
/// `total_limit` over the whole fight.
#[derive(Component, Debug)]
pub struct MinionSpawner {
    interval: f32,
    max_alive: usize,
    total_limit: usize,
    spawned: usize,
    timer: f32,
}

impl MinionSpawner {
    pub fn new(delay: f32, interval: f32, max_alive: usize, total_limit: usize) -> Self {
        Self {
            interval,
            max_alive,
            total_limit,
            spawned: 0,
            timer: interval - delay,
        }
    }

    pub fn spawned(&self) -> usize {
        self.spawned
    }

    pub fn is_exhausted(&self) -> bool {
        self.spawned >= self.total_limit
    }

    /// Returns true when one minion should be spawned this frame.
    pub fn tick(&mut self, dt: f32, alive: usize) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.timer += dt;
        if self.timer < self.interval {
            return false;
        }
        self.timer = 0.0;

        if alive >= self.max_alive {
            return false;
        }
        self.spawned += 1;
        true
    }
}

impl Default for MinionSpawner {
    fn default() -> Self {
        Self::new(1.0, 3.0, 5, 20)
    }
}

#[derive(Component)]
pub struct Minion;

// ── Projectiles ─────────────────────────────────────────────────────────────

#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity(pub Vec2);

#[derive(Component)]
pub struct BossProjectile;

#[derive(Component)]
pub struct PlayerShot;

pub fn spawn_player_shot(commands: &mut Commands, origin: Vec3) -> Entity {
    let size = Vec2::new(0.4, 0.2);
    commands
        .spawn((
            PlayerShot,
            Velocity(Vec2::X * SHOT_SPEED),
            Lifetime::seconds(PROJECTILE_LIFETIME),
            Hitbox::from_size(size),
            Sprite::from_color(Color::srgb(1.0, 0.85, 0.3), size),
            Transform::from_translation(origin.with_z(2.0)),
            SceneEntity,
        ))
        .id()
}

fn spawn_boss_projectile(commands: &mut Commands, origin: Vec3, direction: Vec2) {
    let size = Vec2::splat(0.35);
    commands.spawn((
        BossProjectile,
        // Player contact treats it like any other enemy.
        SpawnCategory::Enemy,
        Velocity(direction * VOLLEY_SPEED),
        Lifetime::seconds(PROJECTILE_LIFETIME),
        Hitbox::from_size(size),
        Sprite::from_color(Color::srgb(0.9, 0.2, 0.5), size),
        Transform::from_translation(origin.with_z(2.0)),
        SceneEntity,
    ));
}

// ── Scene setup ─────────────────────────────────────────────────────────────

fn setup_arena(
    mut commands: Commands,
    scene: Res<State<SceneId>>,
    table: Res<DifficultyTable>,
    coordinator: Res<GameCoordinator>,
) {
    let scene = *scene.get();
    let index = scene.difficulty().unwrap_or_default().index();
    let health = table.boss_health(index);
    let jump = table.lookup(index).jump;
    let ammo = coordinator.collected_count();

    commands.insert_resource(BossArena::default());

    commands.spawn((
        BossTower::new(health),
        SpecialAttack::new(VOLLEY_COOLDOWN),
        MinionSpawner::default(),
        Hitbox::from_size(TOWER_SIZE),
        Sprite::from_color(TOWER_COLOR, TOWER_SIZE),
        Transform::from_xyz(TOWER_X, GROUND_Y + TOWER_SIZE.y / 2.0, 0.5),
        SceneEntity,
    ));

    commands.spawn((
        Sprite::from_color(Color::srgb(0.3, 0.18, 0.1), Vec2::new(24.0, 3.0)),
        Transform::from_xyz(0.0, GROUND_Y - 1.5, -1.0),
        SceneEntity,
    ));

    spawn_boss_fighter(&mut commands, jump, ammo);
    spawn_hud(
        &mut commands,
        coordinator.player_health(),
        ammo,
        Some((health, health)),
    );

    info!(
        "Entered {}: tower has {} hit points, player has {} shots",
        scene.name(),
        health,
        ammo
    );
}

fn teardown_arena(mut commands: Commands) {
    commands.remove_resource::<BossArena>();
}

// ── Systems ─────────────────────────────────────────────────────────────────

fn special_attack_system(
    mut commands: Commands,
    mut towers: Query<(&Transform, &mut SpecialAttack), With<BossTower>>,
    players: Query<&Transform, With<Player>>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();
    let Some(player) = players.iter().next() else {
        return;
    };

    for (transform, mut attack) in &mut towers {
        if !attack.tick(dt) {
            continue;
        }
        let aim = (player.translation - transform.translation).truncate();
        for direction in fan_directions(aim, VOLLEY_COUNT, VOLLEY_SPREAD_DEGREES) {
            spawn_boss_projectile(&mut commands, transform.translation, direction);
        }
        debug!("Tower fired a volley");
    }
}

fn minion_spawn_system(
    mut commands: Commands,
    mut spawners: Query<(&Transform, &mut MinionSpawner)>,
    minions: Query<(), With<Minion>>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();
    let alive = minions.iter().count();

    for (transform, mut spawner) in &mut spawners {
        if !spawner.tick(dt, alive) {
            continue;
        }
        commands.spawn((
            Minion,
            SpawnCategory::Enemy,
            Hitbox::from_size(MINION_SIZE),
            Sprite::from_color(Color::srgb(0.4, 0.22, 0.1), MINION_SIZE),
            Transform::from_xyz(
                transform.translation.x - TOWER_SIZE.x,
                GROUND_Y + MINION_SIZE.y / 2.0,
                1.0,
            ),
            SceneEntity,
        ));
        debug!("Minion {} spawned", spawner.spawned());
    }
}

fn minion_chase_system(
    mut minions: Query<&mut Transform, (With<Minion>, Without<Player>)>,
    players: Query<&Transform, With<Player>>,
    time: Res<Time>,
) {
    let Some(player) = players.iter().next() else {
        return;
    };
    let step = MINION_CHASE_SPEED * time.delta_secs();

    for mut transform in &mut minions {
        let gap = player.translation.x - transform.translation.x;
        transform.translation.x += gap.clamp(-step, step);
    }
}

fn velocity_system(mut query: Query<(&mut Transform, &Velocity)>, time: Res<Time>) {
    let dt = time.delta_secs();
    for (mut transform, velocity) in &mut query {
        transform.translation += (velocity.0 * dt).extend(0.0);
    }
}

/// The tower has no contact reaction of its own; it only reacts to shots.
fn shot_hit_system(
    mut commands: Commands,
    shots: Query<(Entity, &Transform, &Hitbox), With<PlayerShot>>,
    mut towers: Query<(Entity, &Transform, &Hitbox, &mut BossTower, &Sprite, Has<Invincibility>)>,
    minions: Query<(Entity, &Transform, &Hitbox), With<Minion>>,
) {
    for (shot, shot_transform, shot_box) in &shots {
        let shot_center = shot_transform.translation.truncate();

        if let Some(minion) = minions.iter().find(|(_, transform, hitbox)| {
            overlaps(shot_center, shot_box, transform.translation.truncate(), hitbox)
        }) {
            commands.entity(minion.0).try_despawn();
            commands.entity(shot).try_despawn();
            continue;
        }

        for (tower, transform, hitbox, mut boss, sprite, flashing) in &mut towers {
            if !overlaps(shot_center, shot_box, transform.translation.truncate(), hitbox) {
                continue;
            }
            commands.entity(shot).try_despawn();
            if flashing || boss.health() == 0 {
                break;
            }

            let remaining = boss.take_damage(1);
            commands.trigger(BossHealthChanged {
                current: remaining,
                max: boss.max_health(),
            });
            if remaining == 0 {
                commands.trigger(BossDefeated { tower });
            } else {
                commands.entity(tower).insert(Invincibility::new(
                    HIT_FLASH_SECONDS,
                    HIT_FLASH_PERIOD,
                    BlinkStyle::Tint {
                        tint: Color::srgb(1.0, 0.0, 0.0),
                        base: sprite.color,
                    },
                ));
            }
            break;
        }
    }
}

// ── Defeat ──────────────────────────────────────────────────────────────────

#[derive(Event, Debug)]
pub struct BossDefeated {
    pub tower: Entity,
}

fn on_boss_defeated(
    event: On<BossDefeated>,
    mut commands: Commands,
    arena: Option<ResMut<BossArena>>,
    mut coordinator: ResMut<GameCoordinator>,
    mut time: ResMut<Time<Virtual>>,
) {
    let Some(mut arena) = arena else {
        warn!("Boss defeated outside of a boss scene; ignoring");
        return;
    };
    if arena.defeated {
        return;
    }
    arena.defeated = true;

    info!("Boss defeated!");
    commands.entity(event.tower).try_despawn();
    coordinator.on_stage_cleared();
    commands.trigger(ShowEndPanel(EndPanel::Clear));
    time.pause();
}
