use bevy::prelude::*;

use crate::level::LevelCoordinator;

pub struct ScrollPlugin;

impl Plugin for ScrollPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                (scroll_system, infinite_scroller_system)
                    .run_if(resource_exists::<LevelCoordinator>),
                lifetime_system,
            ),
        );
    }
}

/// Moves an entity left at the level's scroll speed.
#[derive(Component, Debug, Clone, Copy)]
pub struct Scroll {
    pub speed_multiplier: f32,
    /// Degrees per second around Z; zero for things that should not spin.
    pub spin_degrees_per_sec: f32,
}

impl Scroll {
    pub fn plain() -> Self {
        Self {
            speed_multiplier: 1.0,
            spin_degrees_per_sec: 0.0,
        }
    }

    pub fn spinning(degrees_per_sec: f32) -> Self {
        Self {
            speed_multiplier: 1.0,
            spin_degrees_per_sec: degrees_per_sec,
        }
    }
}

/// Despawns the entity once `remaining` runs out.
#[derive(Component, Debug)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifetime {
    pub fn seconds(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    /// Returns true once the lifetime is used up.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

/// A background tile that wraps around once it has fully left the screen.
/// Two tiles of the same width placed side by side give an endless strip.
#[derive(Component, Debug)]
pub struct InfiniteScroller {
    pub width: f32,
    pub speed_multiplier: f32,
}

/// Jumps a tile forward by two widths once it is a full width past the origin.
pub fn wrap_position(x: f32, width: f32) -> f32 {
    if x < -width {
        x + width * 2.0
    } else {
        x
    }
}

fn scroll_system(
    mut query: Query<(&mut Transform, &Scroll)>,
    level: Res<LevelCoordinator>,
    time: Res<Time>,
) {
    if !level.is_active() {
        return;
    }
    let dt = time.delta_secs();
    let speed = level.scroll_speed();

    for (mut transform, scroll) in &mut query {
        transform.translation.x -= speed * scroll.speed_multiplier * dt;
        if scroll.spin_degrees_per_sec != 0.0 {
            transform.rotate_z((scroll.spin_degrees_per_sec * dt).to_radians());
        }
    }
}

fn infinite_scroller_system(
    mut query: Query<(&mut Transform, &InfiniteScroller)>,
    level: Res<LevelCoordinator>,
    time: Res<Time>,
) {
    if !level.is_active() {
        return;
    }
    let dt = time.delta_secs();

    for (mut transform, scroller) in &mut query {
        let x = transform.translation.x - level.scroll_speed() * scroller.speed_multiplier * dt;
        transform.translation.x = wrap_position(x, scroller.width);
    }
}

/// Lifetimes stand still while a level is frozen, so nothing vanishes
/// from under the player during the end sequence.
fn lifetime_system(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Lifetime)>,
    level: Option<Res<LevelCoordinator>>,
    time: Res<Time>,
) {
    if level.is_some_and(|level| !level.is_active()) {
        return;
    }
    let dt = time.delta_secs();

    for (entity, mut lifetime) in &mut query {
        if lifetime.tick(dt) {
            commands.entity(entity).try_despawn();
        }
    }
}
