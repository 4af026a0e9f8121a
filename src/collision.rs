use bevy::prelude::*;

use crate::{player::Player, registry::SpawnCategory};

pub struct CollisionPlugin;

impl Plugin for CollisionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, contact_system);
    }
}

/// Axis-aligned box centred on the entity's translation.
#[derive(Component, Debug, Clone, Copy)]
pub struct Hitbox {
    pub half_extents: Vec2,
}

impl Hitbox {
    pub fn from_size(size: Vec2) -> Self {
        Self {
            half_extents: size / 2.0,
        }
    }
}

/// The player's box overlaps a categorized entity this frame.
#[derive(Event, Debug, Clone, Copy)]
pub struct Contact {
    pub player: Entity,
    pub other: Entity,
    pub category: SpawnCategory,
}

pub fn overlaps(a_center: Vec2, a: &Hitbox, b_center: Vec2, b: &Hitbox) -> bool {
    let delta = (a_center - b_center).abs();
    let reach = a.half_extents + b.half_extents;
    delta.x < reach.x && delta.y < reach.y
}

/// Reports overlaps only; nothing is pushed apart here.
fn contact_system(
    mut commands: Commands,
    players: Query<(Entity, &Transform, &Hitbox), With<Player>>,
    others: Query<(Entity, &Transform, &Hitbox, &SpawnCategory), Without<Player>>,
) {
    for (player, player_transform, player_box) in &players {
        let player_center = player_transform.translation.truncate();
        for (other, transform, hitbox, category) in &others {
            // Decor and platforms have no contact reaction.
            if matches!(category, SpawnCategory::Decor | SpawnCategory::Platform) {
                continue;
            }
            if overlaps(player_center, player_box, transform.translation.truncate(), hitbox) {
                commands.trigger(Contact {
                    player,
                    other,
                    category: *category,
                });
            }
        }
    }
}
