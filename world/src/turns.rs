//! Round-robin turn scheduling over the roster of characters.

use std::time::Duration;

use hellguard_core::{EntityId, LoopStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Turn,
    Interlude { remaining: Duration },
}

/// Hands control to one roster member at a time.
#[derive(Debug)]
pub(crate) struct TurnScheduler {
    roster: Vec<EntityId>,
    phase: Phase,
    paused: bool,
    active: Option<EntityId>,
    previous: Option<EntityId>,
    starting: Option<EntityId>,
    interlude: Duration,
}

impl TurnScheduler {
    pub(crate) fn new(interlude: Duration) -> Self {
        Self {
            roster: Vec::new(),
            phase: Phase::Idle,
            paused: false,
            active: None,
            previous: None,
            starting: None,
            interlude,
        }
    }

    /// Forgets the roster and stops the loop.
    pub(crate) fn reset(&mut self) {
        self.roster.clear();
        self.starting = None;
        self.stop();
    }

    pub(crate) fn enroll(&mut self, entity: EntityId) {
        if !self.roster.contains(&entity) {
            self.roster.push(entity);
        }
    }

    /// Removes an entity from the roster without disturbing the rotation.
    ///
    /// When the removed entity is the one the rotation continues from, its
    /// roster predecessor takes that role, so the entity that followed it
    /// still acts next.
    pub(crate) fn withdraw(&mut self, entity: EntityId) {
        let Some(position) = self.roster.iter().position(|member| *member == entity) else {
            return;
        };
        let count = self.roster.len();
        let predecessor = (count > 1).then(|| self.roster[(position + count - 1) % count]);

        if self.previous == Some(entity) {
            self.previous = predecessor;
        }
        if self.active == Some(entity) {
            self.active = None;
            self.previous = predecessor;
            if self.phase == Phase::Turn {
                self.phase = Phase::Interlude {
                    remaining: self.interlude,
                };
            }
        }
        if self.starting == Some(entity) {
            self.starting = None;
        }

        let _ = self.roster.remove(position);
        if self.roster.is_empty() {
            self.stop();
        }
    }

    /// Pre-selects the first entity to act. Only honored while idle.
    pub(crate) fn set_starting(&mut self, entity: EntityId) -> bool {
        if self.phase != Phase::Idle || !self.roster.contains(&entity) {
            return false;
        }
        self.starting = Some(entity);
        true
    }

    /// Starts the loop, returning the entity whose turn begins.
    pub(crate) fn start(&mut self) -> Option<EntityId> {
        if self.phase != Phase::Idle {
            return None;
        }
        let first = self
            .starting
            .take()
            .or_else(|| self.roster.first().copied())?;
        self.active = Some(first);
        self.previous = None;
        self.paused = false;
        self.phase = Phase::Turn;
        Some(first)
    }

    /// Ends the active entity's turn. Returns `false` for any other entity.
    pub(crate) fn finish(&mut self, entity: EntityId) -> bool {
        if self.phase != Phase::Turn || self.active != Some(entity) {
            return false;
        }
        self.previous = Some(entity);
        self.active = None;
        self.phase = Phase::Interlude {
            remaining: self.interlude,
        };
        true
    }

    pub(crate) fn pause(&mut self) {
        self.paused = true;
    }

    pub(crate) fn resume(&mut self) {
        self.paused = false;
    }

    pub(crate) fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.paused = false;
        self.active = None;
        self.previous = None;
    }

    /// Advances the interlude between turns, returning the entity whose turn
    /// starts once the interlude elapsed and the loop is not paused.
    pub(crate) fn advance(&mut self, dt: Duration) -> Option<EntityId> {
        let Phase::Interlude { remaining } = self.phase else {
            return None;
        };
        let remaining = remaining.saturating_sub(dt);
        self.phase = Phase::Interlude { remaining };
        if !remaining.is_zero() || self.paused {
            return None;
        }

        let next = self.successor()?;
        self.active = Some(next);
        self.phase = Phase::Turn;
        Some(next)
    }

    pub(crate) fn status(&self) -> LoopStatus {
        match (self.phase, self.paused) {
            (Phase::Idle, _) => LoopStatus::Idle,
            (_, true) => LoopStatus::Paused,
            (_, false) => LoopStatus::Running,
        }
    }

    pub(crate) fn active(&self) -> Option<EntityId> {
        self.active
    }

    pub(crate) fn roster(&self) -> &[EntityId] {
        &self.roster
    }

    fn successor(&self) -> Option<EntityId> {
        if self.roster.is_empty() {
            return None;
        }
        let index = self
            .previous
            .and_then(|previous| self.roster.iter().position(|member| *member == previous))
            .map_or(0, |position| (position + 1) % self.roster.len());
        Some(self.roster[index])
    }
}
