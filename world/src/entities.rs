//! Registry of entities and their health/throw/death life cycle.

use std::{collections::BTreeMap, time::Duration};

use hellguard_core::{
    damage_dealt, EntityId, EntityKind, EntitySnapshot, EntityStats, TileCoord,
};

/// Mutable state tracked for every entity on the board.
#[derive(Clone, Debug)]
pub(crate) struct EntityState {
    pub(crate) id: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) strength: u32,
    pub(crate) max_health: i32,
    pub(crate) health: i32,
    pub(crate) tile: Option<TileCoord>,
    pub(crate) being_thrown: bool,
    pub(crate) dead: bool,
    pub(crate) linger: Duration,
}

impl EntityState {
    /// Tile the entity owns while it stands on the board.
    pub(crate) fn grounded_tile(&self) -> Option<TileCoord> {
        if self.being_thrown || self.dead {
            None
        } else {
            self.tile
        }
    }

    /// Subtracts the damage an attack of `attack` strength deals and returns it.
    pub(crate) fn apply_damage(&mut self, attack: u32) -> u32 {
        let amount = damage_dealt(attack, self.strength);
        self.health = self
            .health
            .saturating_sub(i32::try_from(amount).unwrap_or(i32::MAX));
        amount
    }

    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            tile: self.tile,
            strength: self.strength,
            health: self.health,
            max_health: self.max_health,
            being_thrown: self.being_thrown,
            dead: self.dead,
        }
    }
}

/// Stores entities keyed by identifier in deterministic order.
#[derive(Debug, Default)]
pub(crate) struct EntityRegistry {
    entities: BTreeMap<EntityId, EntityState>,
    next_id: u32,
}

impl EntityRegistry {
    /// Removes every entity while keeping identifiers unique across levels.
    pub(crate) fn clear(&mut self) {
        self.entities.clear();
    }

    /// Registers a new entity standing on `tile` and returns its identifier.
    pub(crate) fn insert(
        &mut self,
        kind: EntityKind,
        tile: TileCoord,
        stats: EntityStats,
    ) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let state = EntityState {
            id,
            kind,
            strength: stats.strength,
            max_health: stats.health,
            health: stats.health,
            tile: Some(tile),
            being_thrown: false,
            dead: false,
            linger: stats.linger(),
        };
        let _ = self.entities.insert(id, state);
        id
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityState> {
        self.entities.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }
}
