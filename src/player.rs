use bevy::prelude::*;

use crate::{
    audio::{PlaySfx, SfxId},
    boss::spawn_player_shot,
    collision::{Contact, Hitbox},
    difficulty::JumpTuning,
    effects::{BlinkStyle, Invincibility},
    game::{gameplay_unpaused, GameCoordinator, LevelComplete, PlayerDied, SceneEntity},
    hud::{HealthChanged, ResourceCountChanged},
    level::LevelCoordinator,
    registry::SpawnCategory,
};

/// Top of the ground strip in world units.
pub const GROUND_Y: f32 = -3.5;
pub const RUNNER_X: f32 = -6.0;

const GRAVITY: f32 = 9.81;
const PLAYER_SIZE: Vec2 = Vec2::new(0.8, 1.0);
const AUTO_WALK_SPEED: f32 = 5.0;
const INVINCIBLE_SECONDS: f32 = 1.5;
const BLINK_PERIOD: f32 = 0.1;
const BOSS_MOVE_SPEED: f32 = 5.0;
const SHOT_COOLDOWN: f32 = 1.0;
/// Horizontal limit of the boss arena.
const ARENA_HALF_WIDTH: f32 = 9.0;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                runner_jump_system
                    .run_if(resource_exists::<LevelCoordinator>)
                    .run_if(gameplay_unpaused),
                auto_walk_system,
                boss_fighter_input_system.run_if(gameplay_unpaused),
            ),
        )
        .add_systems(FixedUpdate, vertical_physics_system)
        .add_observer(on_player_contact);
    }
}

// ── Components ──────────────────────────────────────────────────────────────

#[derive(Component, Debug, Default)]
pub struct Player {
    pub collected: u32,
    reached_end: bool,
}

impl Player {
    pub fn runner() -> Self {
        Self::default()
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }
}

/// Vertical motion only; horizontal movement is either scroll-relative
/// (runner) or direct input (boss fight).
#[derive(Component, Debug, Clone)]
pub struct Kinematics {
    pub velocity_y: f32,
    pub grounded: bool,
    pub jump: JumpTuning,
}

impl Kinematics {
    pub fn new(jump: JumpTuning) -> Self {
        Self {
            velocity_y: 0.0,
            grounded: true,
            jump,
        }
    }

    /// Starts a jump if standing on something. Returns whether it did.
    pub fn try_jump(&mut self) -> bool {
        if !self.grounded {
            return false;
        }
        self.velocity_y = self.jump.jump_speed;
        self.grounded = false;
        true
    }
}

/// Input-independent walk to the end point. Removed on arrival.
#[derive(Component, Debug)]
pub struct AutoWalk {
    pub target: Entity,
    pub speed: f32,
}

impl AutoWalk {
    pub fn toward(target: Entity) -> Self {
        Self {
            target,
            speed: AUTO_WALK_SPEED,
        }
    }
}

/// The boss-fight loadout: every item collected on the run is one shot.
#[derive(Component, Debug)]
pub struct BossFighter {
    ammo: u32,
    cooldown: f32,
    cooldown_remaining: f32,
}

impl BossFighter {
    pub fn new(ammo: u32) -> Self {
        Self {
            ammo,
            cooldown: SHOT_COOLDOWN,
            cooldown_remaining: 0.0,
        }
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn tick(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }

    /// Spends one shot if the cooldown is over and ammo is left.
    pub fn try_fire(&mut self) -> bool {
        if self.cooldown_remaining > 0.0 || self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        self.cooldown_remaining = self.cooldown;
        true
    }
}

pub fn spawn_runner(commands: &mut Commands, jump: JumpTuning) -> Entity {
    commands
        .spawn((
            Player::runner(),
            Kinematics::new(jump),
            Hitbox::from_size(PLAYER_SIZE),
            Sprite::from_color(Color::srgb(0.95, 0.9, 0.8), PLAYER_SIZE),
            Transform::from_xyz(RUNNER_X, GROUND_Y + PLAYER_SIZE.y / 2.0, 1.0),
            SceneEntity,
        ))
        .id()
}

pub fn spawn_boss_fighter(commands: &mut Commands, jump: JumpTuning, ammo: u32) -> Entity {
    commands
        .spawn((
            Player::runner(),
            BossFighter::new(ammo),
            Kinematics::new(jump),
            Hitbox::from_size(PLAYER_SIZE),
            Sprite::from_color(Color::srgb(0.95, 0.9, 0.8), PLAYER_SIZE),
            Transform::from_xyz(-7.0, GROUND_Y + PLAYER_SIZE.y / 2.0, 1.0),
            SceneEntity,
        ))
        .id()
}

// ── Physics ─────────────────────────────────────────────────────────────────

/// Highest surface under the player's feet: the ground, or the top of a
/// platform that overlaps horizontally and is not above the feet.
pub fn support_height(
    feet_y: f32,
    x: f32,
    half_width: f32,
    platforms: impl IntoIterator<Item = (Vec2, Vec2)>,
) -> f32 {
    platforms
        .into_iter()
        .filter(|(center, half)| (center.x - x).abs() < half.x + half_width)
        .map(|(center, half)| center.y + half.y)
        .filter(|top| *top <= feet_y + 0.05)
        .fold(GROUND_Y, f32::max)
}

/// One fixed step of vertical motion. Returns the new centre height,
/// velocity and whether the body ended up standing.
pub fn integrate_vertical(
    y: f32,
    velocity: f32,
    half_height: f32,
    support: f32,
    gravity: f32,
    dt: f32,
) -> (f32, f32, bool) {
    let velocity = velocity - gravity * dt;
    let y = y + velocity * dt;
    if velocity <= 0.0 && y - half_height <= support {
        (support + half_height, 0.0, true)
    } else {
        (y, velocity, false)
    }
}

fn vertical_physics_system(
    mut players: Query<(&mut Transform, &mut Kinematics, &Hitbox), With<Player>>,
    platforms: Query<(&Transform, &Hitbox, &SpawnCategory), Without<Player>>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (mut transform, mut body, hitbox) in &mut players {
        let half = hitbox.half_extents;
        let feet = transform.translation.y - half.y;
        let support = support_height(
            feet,
            transform.translation.x,
            half.x,
            platforms
                .iter()
                .filter(|(_, _, category)| **category == SpawnCategory::Platform)
                .map(|(t, b, _)| (t.translation.truncate(), b.half_extents)),
        );

        let (y, velocity, grounded) = integrate_vertical(
            transform.translation.y,
            body.velocity_y,
            half.y,
            support,
            GRAVITY * body.jump.gravity_scale,
            dt,
        );
        transform.translation.y = y;
        body.velocity_y = velocity;
        body.grounded = grounded;
    }
}

// ── Input ───────────────────────────────────────────────────────────────────

fn jump_pressed(keys: &ButtonInput<KeyCode>) -> bool {
    keys.any_just_pressed([KeyCode::Space, KeyCode::ArrowUp, KeyCode::KeyW])
}

fn runner_jump_system(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    level: Res<LevelCoordinator>,
    mut players: Query<&mut Kinematics, (With<Player>, Without<AutoWalk>, Without<BossFighter>)>,
) {
    if !level.is_active() || !jump_pressed(&keys) {
        return;
    }
    for mut body in &mut players {
        if body.try_jump() {
            commands.trigger(PlaySfx(SfxId::Jump));
        }
    }
}

fn auto_walk_system(mut walkers: Query<(&mut Transform, &AutoWalk)>, time: Res<Time>) {
    let dt = time.delta_secs();
    for (mut transform, walk) in &mut walkers {
        transform.translation.x += walk.speed * dt;
    }
}

fn boss_fighter_input_system(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    mut fighters: Query<(&mut Transform, &mut Kinematics, &mut BossFighter)>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (mut transform, mut body, mut fighter) in &mut fighters {
        fighter.tick(dt);

        let mut direction = 0.0;
        if keys.any_pressed([KeyCode::ArrowLeft, KeyCode::KeyA]) {
            direction -= 1.0;
        }
        if keys.any_pressed([KeyCode::ArrowRight, KeyCode::KeyD]) {
            direction += 1.0;
        }
        transform.translation.x = (transform.translation.x + direction * BOSS_MOVE_SPEED * dt)
            .clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);

        // A paused fight has zero dt; keep presses from queueing up shots or jumps.
        if dt == 0.0 {
            continue;
        }

        if jump_pressed(&keys) && body.try_jump() {
            commands.trigger(PlaySfx(SfxId::Jump));
        }

        if keys.just_pressed(KeyCode::KeyZ) {
            if fighter.try_fire() {
                spawn_player_shot(&mut commands, transform.translation);
                commands.trigger(PlaySfx(SfxId::Attack));
                commands.trigger(ResourceCountChanged(fighter.ammo()));
            } else {
                debug!("Cannot fire: ammo {}", fighter.ammo());
            }
        }
    }
}

// ── Contacts ────────────────────────────────────────────────────────────────

pub fn on_player_contact(
    contact: On<Contact>,
    mut commands: Commands,
    mut players: Query<(&mut Player, Has<Invincibility>)>,
    mut coordinator: ResMut<GameCoordinator>,
) {
    let Ok((mut player, invincible)) = players.get_mut(contact.player) else {
        return;
    };

    match contact.category {
        SpawnCategory::Enemy => {
            if invincible || coordinator.is_game_over() || coordinator.is_stage_cleared() {
                return;
            }
            commands.entity(contact.other).try_despawn();
            commands.trigger(PlaySfx(SfxId::Collision));

            let health = coordinator.damage_player(1);
            commands.trigger(HealthChanged(health));
            info!("Player hit, health {}", health);

            if health == 0 {
                commands.trigger(PlayerDied);
            } else {
                commands.entity(contact.player).insert(Invincibility::new(
                    INVINCIBLE_SECONDS,
                    BLINK_PERIOD,
                    BlinkStyle::Toggle,
                ));
            }
        }
        SpawnCategory::Item => {
            commands.entity(contact.other).try_despawn();
            player.collected += 1;
            commands.trigger(ResourceCountChanged(player.collected));
            commands.trigger(PlaySfx(SfxId::ItemGet));
        }
        SpawnCategory::Terminal => {
            if player.reached_end {
                return;
            }
            player.reached_end = true;
            commands.entity(contact.player).remove::<AutoWalk>();
            commands.trigger(LevelComplete {
                collected: player.collected,
            });
        }
        SpawnCategory::Platform | SpawnCategory::Decor => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AudioSettings;

    const SOFT_JUMP: JumpTuning = JumpTuning {
        jump_speed: 10.0,
        gravity_scale: 1.0,
    };

    #[test]
    fn falling_body_lands_on_the_support() {
        let (y, velocity, grounded) = integrate_vertical(0.0, -20.0, 0.5, -0.5, GRAVITY, 0.1);
        assert!(grounded);
        assert_eq!(y, 0.0);
        assert_eq!(velocity, 0.0);
    }

    #[test]
    fn rising_body_passes_through_platforms() {
        let (y, velocity, grounded) = integrate_vertical(0.0, 10.0, 0.5, 0.2, GRAVITY, 0.02);
        assert!(!grounded);
        assert!(y > 0.0);
        assert!(velocity > 0.0);
    }

    #[test]
    fn only_platforms_below_the_feet_support() {
        let platforms = [
            (Vec2::new(0.0, -1.0), Vec2::new(0.75, 0.25)),
            (Vec2::new(0.0, 2.0), Vec2::new(0.75, 0.25)),
            (Vec2::new(5.0, -0.5), Vec2::new(0.75, 0.25)),
        ];
        assert_eq!(support_height(0.0, 0.0, 0.4, platforms), -0.75);
        assert_eq!(support_height(-2.0, 0.0, 0.4, platforms), GROUND_Y);
        assert_eq!(support_height(0.0, 3.0, 0.4, platforms), GROUND_Y);
    }

    #[test]
    fn jump_needs_ground() {
        let mut body = Kinematics::new(SOFT_JUMP);
        assert!(body.try_jump());
        assert_eq!(body.velocity_y, 10.0);
        assert!(!body.try_jump());
    }

    #[test]
    fn shots_respect_cooldown_and_ammo() {
        let mut fighter = BossFighter::new(2);
        assert!(fighter.try_fire());
        assert!(!fighter.try_fire());
        fighter.tick(0.5);
        assert!(!fighter.try_fire());
        fighter.tick(0.5);
        assert!(fighter.try_fire());
        fighter.tick(1.0);
        assert!(!fighter.try_fire());
        assert_eq!(fighter.ammo(), 0);
    }

    // ── Contacts on a bare World ────────────────────────────────────────────

    #[derive(Resource, Default)]
    struct Seen {
        completions: Vec<u32>,
        deaths: usize,
    }

    fn record_completion(event: On<LevelComplete>, mut seen: ResMut<Seen>) {
        seen.completions.push(event.collected);
    }

    fn record_death(_event: On<PlayerDied>, mut seen: ResMut<Seen>) {
        seen.deaths += 1;
    }

    fn contact_world() -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(GameCoordinator::new(AudioSettings::default()));
        world.init_resource::<Seen>();
        world.add_observer(on_player_contact);
        world.add_observer(record_completion);
        world.add_observer(record_death);
        let player = world.spawn(Player::runner()).id();
        (world, player)
    }

    fn touch(world: &mut World, player: Entity, other: Entity, category: SpawnCategory) {
        world.trigger(Contact {
            player,
            other,
            category,
        });
        world.flush();
    }

    #[test]
    fn items_are_counted_and_removed() {
        let (mut world, player) = contact_world();
        for _ in 0..3 {
            let item = world.spawn(SpawnCategory::Item).id();
            touch(&mut world, player, item, SpawnCategory::Item);
            assert!(world.get_entity(item).is_err());
        }
        assert_eq!(world.get::<Player>(player).map(|p| p.collected), Some(3));
    }

    #[test]
    fn enemy_hit_costs_health_and_grants_invincibility() {
        let (mut world, player) = contact_world();
        let first = world.spawn(SpawnCategory::Enemy).id();
        touch(&mut world, player, first, SpawnCategory::Enemy);

        assert_eq!(world.resource::<GameCoordinator>().player_health(), 2);
        assert!(world.get::<Invincibility>(player).is_some());

        let second = world.spawn(SpawnCategory::Enemy).id();
        touch(&mut world, player, second, SpawnCategory::Enemy);
        assert_eq!(world.resource::<GameCoordinator>().player_health(), 2);
        assert!(world.get_entity(second).is_ok(), "invincible contact leaves the enemy");
    }

    #[test]
    fn third_hit_kills_once() {
        let (mut world, player) = contact_world();
        for _ in 0..3 {
            world.entity_mut(player).remove::<Invincibility>();
            let enemy = world.spawn(SpawnCategory::Enemy).id();
            touch(&mut world, player, enemy, SpawnCategory::Enemy);
        }
        assert_eq!(world.resource::<Seen>().deaths, 1);

        // Hits after game over are ignored.
        world.resource_mut::<GameCoordinator>().on_player_died();
        let enemy = world.spawn(SpawnCategory::Enemy).id();
        touch(&mut world, player, enemy, SpawnCategory::Enemy);
        assert_eq!(world.resource::<Seen>().deaths, 1);
    }

    #[test]
    fn terminal_completes_the_level_once_with_the_count() {
        let (mut world, player) = contact_world();
        let marker = world.spawn(SpawnCategory::Terminal).id();
        world.entity_mut(player).insert(AutoWalk::toward(marker));
        let item = world.spawn(SpawnCategory::Item).id();
        touch(&mut world, player, item, SpawnCategory::Item);

        touch(&mut world, player, marker, SpawnCategory::Terminal);
        touch(&mut world, player, marker, SpawnCategory::Terminal);

        assert_eq!(world.resource::<Seen>().completions, vec![1]);
        assert!(world.get::<AutoWalk>(player).is_none());
    }
}
