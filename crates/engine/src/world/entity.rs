//! Living-entity registry for one world.
//!
//! Tracks players (the observers used for job prioritisation) and the
//! non-player living occupants that get purged before a settlement is
//! rebuilt. Inanimate entities are tracked too but never purged.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::position::BlockBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A connected player. Never purged; counts as an observer.
    Player,
    /// Any other living entity (villagers, golems, cats...).
    Living,
    /// Non-living entities such as item frames or minecarts.
    Inanimate,
}

/// Information about an entity, stored in the registry.
#[derive(Clone, Debug)]
pub struct EntityInfo {
    pub id: u64,
    pub kind: EntityKind,
    /// Host type identifier, e.g. `minecraft:villager`.
    pub type_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Thread-safe registry of all entities in a world.
///
/// Uses `std::sync::RwLock` because every operation is brief and the access
/// pattern is read-heavy (observer snapshots every tick).
pub struct EntityRegistry {
    entities: RwLock<HashMap<u64, EntityInfo>>,
    next_id: AtomicU64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add an entity and return its id.
    pub fn spawn(&self, kind: EntityKind, type_id: impl Into<String>, x: f64, y: f64, z: f64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let info = EntityInfo {
            id,
            kind,
            type_id: type_id.into(),
            x,
            y,
            z,
        };
        self.entities
            .write()
            .expect("entity registry poisoned")
            .insert(id, info);
        id
    }

    pub fn despawn(&self, id: u64) -> Option<EntityInfo> {
        self.entities
            .write()
            .expect("entity registry poisoned")
            .remove(&id)
    }

    /// Remove every non-player living entity inside `region`.
    pub fn purge_living(&self, region: &BlockBox) -> Vec<EntityInfo> {
        let mut entities = self.entities.write().expect("entity registry poisoned");
        let doomed: Vec<u64> = entities
            .values()
            .filter(|e| e.kind == EntityKind::Living && region.contains(e.x, e.y, e.z))
            .map(|e| e.id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| entities.remove(&id))
            .collect()
    }

    /// Positions of every connected player.
    pub fn observers(&self) -> Vec<(f64, f64, f64)> {
        self.entities
            .read()
            .expect("entity registry poisoned")
            .values()
            .filter(|e| e.kind == EntityKind::Player)
            .map(|e| (e.x, e.y, e.z))
            .collect()
    }

    /// Snapshot of all currently registered entities.
    pub fn snapshot(&self) -> Vec<EntityInfo> {
        self.entities
            .read()
            .expect("entity registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entities.read().expect("entity registry poisoned").len()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
