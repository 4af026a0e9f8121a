use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

pub struct RegistryPlugin;

impl Plugin for RegistryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EntityRegistry>()
            .add_observer(register_spawned)
            .add_observer(deregister_despawned);
    }
}

/// What kind of thing a spawned entity is. Gameplay branches on this;
/// rendering does not.
#[derive(Component, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpawnCategory {
    Enemy,
    Item,
    Platform,
    Terminal,
    Decor,
}

/// Live entities grouped by `SpawnCategory`.
///
/// Membership is kept up to date by two observers: one fires when a
/// `SpawnCategory` is added to an entity, the other right before it is
/// removed (which includes despawning). Nothing else writes to it.
#[derive(Resource, Default, Debug)]
pub struct EntityRegistry {
    members: HashMap<SpawnCategory, HashSet<Entity>>,
}

impl EntityRegistry {
    pub fn register(&mut self, category: SpawnCategory, entity: Entity) {
        self.members.entry(category).or_default().insert(entity);
    }

    pub fn deregister(&mut self, category: SpawnCategory, entity: Entity) {
        if let Some(set) = self.members.get_mut(&category) {
            set.remove(&entity);
        }
    }

    pub fn contains(&self, category: SpawnCategory, entity: Entity) -> bool {
        self.members
            .get(&category)
            .is_some_and(|set| set.contains(&entity))
    }

    pub fn members(&self, category: SpawnCategory) -> impl Iterator<Item = Entity> + '_ {
        self.members
            .get(&category)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn count(&self, category: SpawnCategory) -> usize {
        self.members.get(&category).map_or(0, HashSet::len)
    }
}

pub fn register_spawned(
    add: On<Add, SpawnCategory>,
    categories: Query<&SpawnCategory>,
    mut registry: ResMut<EntityRegistry>,
) {
    if let Ok(category) = categories.get(add.entity) {
        registry.register(*category, add.entity);
    }
}

// Remove fires before the component is actually gone, so it can still be read.
pub fn deregister_despawned(
    remove: On<Remove, SpawnCategory>,
    categories: Query<&SpawnCategory>,
    mut registry: ResMut<EntityRegistry>,
) {
    if let Ok(category) = categories.get(remove.entity) {
        registry.deregister(*category, remove.entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_world() -> World {
        let mut world = World::new();
        world.init_resource::<EntityRegistry>();
        world.add_observer(register_spawned);
        world.add_observer(deregister_despawned);
        world
    }

    #[test]
    fn spawned_entities_are_indexed_by_category() {
        let mut world = registry_world();
        let enemy = world.spawn(SpawnCategory::Enemy).id();
        world.spawn(SpawnCategory::Enemy);
        let item = world.spawn(SpawnCategory::Item).id();
        world.flush();

        let registry = world.resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Enemy), 2);
        assert_eq!(registry.count(SpawnCategory::Item), 1);
        assert_eq!(registry.count(SpawnCategory::Terminal), 0);
        assert!(registry.contains(SpawnCategory::Enemy, enemy));
        assert!(registry.contains(SpawnCategory::Item, item));
        assert!(!registry.contains(SpawnCategory::Enemy, item));
    }

    #[test]
    fn despawned_entities_leave_the_registry() {
        let mut world = registry_world();
        let enemy = world.spawn(SpawnCategory::Enemy).id();
        let keep = world.spawn(SpawnCategory::Enemy).id();
        world.flush();

        world.despawn(enemy);
        world.flush();

        let registry = world.resource::<EntityRegistry>();
        assert_eq!(registry.count(SpawnCategory::Enemy), 1);
        assert_eq!(registry.members(SpawnCategory::Enemy).collect::<Vec<_>>(), vec![keep]);
    }

    #[test]
    fn deregistering_an_unknown_entity_is_harmless() {
        let mut registry = EntityRegistry::default();
        registry.deregister(SpawnCategory::Decor, Entity::PLACEHOLDER);
        assert_eq!(registry.count(SpawnCategory::Decor), 0);
    }
}
