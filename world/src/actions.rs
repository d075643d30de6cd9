//! Action resolution: walks, melee, throws, projectiles, leaps, and deaths.
//!
//! Health and occupancy change at the moment an action resolves. Motions that
//! take simulated time are tracked here and advanced by `Command::Tick`; each
//! one resolves independently, so a throw chain started by an attack never
//! holds up the attacker's own completion.

use std::time::Duration;

use hellguard_core::{
    ActionError, Direction, EntityId, EntityKind, Event, ProjectileId, TileCoord,
};

use crate::{LevelOutcome, World};

/// Offsets of the eight tiles surrounding a leap landing.
const SURROUNDING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug)]
struct Walk {
    entity: EntityId,
    origin: TileCoord,
    path: Vec<TileCoord>,
    next: usize,
    elapsed: Duration,
}

#[derive(Debug)]
struct Flight {
    entity: EntityId,
    from: TileCoord,
    to: TileCoord,
    elapsed: Duration,
    duration: Duration,
    chain_checked: bool,
}

#[derive(Debug)]
struct Projectile {
    id: ProjectileId,
    shooter: EntityId,
    shooter_kind: EntityKind,
    strength: u32,
    head: TileCoord,
    direction: Direction,
    travelled: f32,
    speed: f32,
}

#[derive(Debug)]
struct Leap {
    entity: EntityId,
    from: TileCoord,
    to: TileCoord,
    elapsed: Duration,
    duration: Duration,
}

#[derive(Debug)]
struct Fade {
    entity: EntityId,
    remaining: Duration,
}

/// Actions currently resolving over simulated time.
#[derive(Debug, Default)]
pub(crate) struct Motions {
    walks: Vec<Walk>,
    flights: Vec<Flight>,
    projectiles: Vec<Projectile>,
    leaps: Vec<Leap>,
    fades: Vec<Fade>,
    next_projectile: u32,
}

impl Motions {
    pub(crate) fn is_empty(&self) -> bool {
        self.walks.is_empty()
            && self.flights.is_empty()
            && self.projectiles.is_empty()
            && self.leaps.is_empty()
            && self.fades.is_empty()
    }

    /// Drops every motion driven by the entity.
    pub(crate) fn forget(&mut self, entity: EntityId) {
        self.walks.retain(|walk| walk.entity != entity);
        self.flights.retain(|flight| flight.entity != entity);
        self.leaps.retain(|leap| leap.entity != entity);
        self.fades.retain(|fade| fade.entity != entity);
    }

    fn allocate_projectile(&mut self) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile);
        self.next_projectile = self.next_projectile.wrapping_add(1);
        id
    }
}

impl World {
    /// Tile owned by a living, grounded entity.
    fn grounded(&self, entity: EntityId) -> Result<TileCoord, ActionError> {
        let state = self
            .entities
            .get(entity)
            .filter(|state| !state.dead)
            .ok_or(ActionError::UnknownEntity)?;
        state.grounded_tile().ok_or(ActionError::NotGrounded)
    }

    pub(crate) fn begin_walk(
        &mut self,
        entity: EntityId,
        path: Vec<TileCoord>,
    ) -> Result<(), ActionError> {
        let origin = self.grounded(entity)?;
        if path.is_empty() {
            return Err(ActionError::EmptyPath);
        }
        if path.iter().any(|tile| !self.grid.contains(*tile)) {
            return Err(ActionError::OutOfBounds);
        }
        self.motions.walks.push(Walk {
            entity,
            origin,
            path,
            next: 0,
            elapsed: Duration::ZERO,
        });
        Ok(())
    }

    pub(crate) fn resolve_melee(
        &mut self,
        attacker: EntityId,
        target: TileCoord,
        advance: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionError> {
        let origin = self.grounded(attacker)?;
        if !self.grid.contains(target) {
            return Err(ActionError::OutOfBounds);
        }
        if origin.manhattan_distance(target) != 1 {
            return Err(ActionError::OutOfReach);
        }
        let victim = self
            .grid
            .occupant(target)
            .filter(|occupant| *occupant != attacker)
            .ok_or(ActionError::NoTarget)?;

        let (attacker_kind, strength) = match self.entities.get(attacker) {
            Some(state) => (state.kind, state.strength),
            None => return Err(ActionError::UnknownEntity),
        };
        let victim_kind = self
            .entities
            .get(victim)
            .map(|state| state.kind)
            .ok_or(ActionError::UnknownEntity)?;

        if attacker_kind == EntityKind::Player && victim_kind.is_throwable_by_shove() {
            // Boulders are shoved, never hurt, and only when they have somewhere to go.
            if self.grid.contains(target.reflect_from(origin)) {
                self.throw_entity(victim, origin, out_events);
            }
        } else {
            self.throw_entity(victim, origin, out_events);
            self.damage_entity(victim, strength, out_events);
        }

        if advance && !self.grid.is_occupied(target) {
            let _ = self.grid.vacate(origin, attacker);
            if self.grid.occupy(target, attacker) {
                if let Some(state) = self.entities.get_mut(attacker) {
                    state.tile = Some(target);
                }
                out_events.push(Event::EntityMoved {
                    entity: attacker,
                    from: origin,
                    to: target,
                });
            } else {
                let _ = self.grid.occupy(origin, attacker);
            }
        }

        out_events.push(Event::ActionCompleted { entity: attacker });
        Ok(())
    }

    pub(crate) fn launch_projectile(
        &mut self,
        shooter: EntityId,
        origin: TileCoord,
        direction: Direction,
        speed: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionError> {
        let (shooter_kind, strength) = self
            .entities
            .get(shooter)
            .filter(|state| !state.dead)
            .map(|state| (state.kind, state.strength))
            .ok_or(ActionError::UnknownEntity)?;
        if !self.grid.contains(origin) {
            return Err(ActionError::OutOfBounds);
        }

        let id = self.motions.allocate_projectile();
        self.motions.projectiles.push(Projectile {
            id,
            shooter,
            shooter_kind,
            strength,
            head: origin,
            direction,
            travelled: self.timings.projectile_head_start,
            speed,
        });
        out_events.push(Event::ProjectileLaunched {
            projectile: id,
            shooter,
            origin,
            direction,
        });
        Ok(())
    }

    pub(crate) fn begin_leap(
        &mut self,
        entity: EntityId,
        destination: TileCoord,
    ) -> Result<(), ActionError> {
        let from = self.grounded(entity)?;
        if !self.grid.contains(destination) {
            return Err(ActionError::OutOfBounds);
        }
        let _ = self.grid.vacate(from, entity);
        if let Some(state) = self.entities.get_mut(entity) {
            state.being_thrown = true;
        }
        let dx = (destination.x() - from.x()) as f32;
        let dy = (destination.y() - from.y()) as f32;
        self.motions.leaps.push(Leap {
            entity,
            from,
            to: destination,
            elapsed: Duration::ZERO,
            duration: travel_time(dx.hypot(dy), self.timings.leap_speed),
        });
        Ok(())
    }

    /// Knocks an entity one tile further along the line from `source`.
    ///
    /// Entities already in flight or dead are left alone, so every entity
    /// takes part in a throw chain at most once and chains always end.
    pub(crate) fn throw_entity(
        &mut self,
        entity: EntityId,
        source: TileCoord,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.entities.get_mut(entity) else {
            return;
        };
        let Some(from) = state.grounded_tile() else {
            return;
        };
        state.being_thrown = true;
        let _ = self.grid.vacate(from, entity);

        let to = from.reflect_from(source);
        if !self.grid.contains(to) {
            log::debug!("{entity:?} thrown off the grid from {from:?}");
            out_events.push(Event::EntityThrown {
                entity,
                from,
                to: None,
            });
            out_events.push(Event::EntityStranded { entity, tile: from });
            return;
        }

        let distance = from.manhattan_distance(source).max(1) as f32;
        self.motions.flights.push(Flight {
            entity,
            from,
            to,
            elapsed: Duration::ZERO,
            duration: travel_time(distance, self.timings.throw_speed),
            chain_checked: false,
        });
        out_events.push(Event::EntityThrown {
            entity,
            from,
            to: Some(to),
        });
    }

    /// Applies an attack of `attack` strength to the entity.
    pub(crate) fn damage_entity(
        &mut self,
        entity: EntityId,
        attack: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.entities.get_mut(entity) else {
            return;
        };
        if state.dead {
            return;
        }
        let amount = state.apply_damage(attack);
        let health = state.health;
        let kind = state.kind;
        out_events.push(Event::EntityDamaged {
            entity,
            amount,
            health,
        });

        if health <= 0 {
            self.kill(entity, out_events);
        } else if kind == EntityKind::Adversary {
            self.unlock(hellguard_core::PlayerAction::Shoot, out_events);
        }
    }

    fn kill(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        let Some(state) = self.entities.get_mut(entity) else {
            return;
        };
        state.dead = true;
        let kind = state.kind;
        let tile = state.tile;
        let in_flight = state.being_thrown;
        let linger = state.linger;

        if !in_flight {
            if let Some(tile) = tile {
                let _ = self.grid.vacate(tile, entity);
            }
        }
        out_events.push(Event::EntityWillDie { entity, kind, tile });
        self.scheduler.withdraw(entity);
        self.motions.walks.retain(|walk| walk.entity != entity);
        self.motions.fades.push(Fade {
            entity,
            remaining: linger + self.timings.despawn_sink,
        });

        match kind {
            EntityKind::Player => self.conclude(LevelOutcome::Lost, out_events),
            EntityKind::Adversary => {
                let remaining = self
                    .entities
                    .iter()
                    .any(|other| other.kind == EntityKind::Adversary && !other.dead);
                if !remaining {
                    self.conclude(LevelOutcome::Cleared, out_events);
                }
            }
            EntityKind::Obstacle => {}
        }
    }

    pub(crate) fn advance_motions(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.advance_walks(dt, out_events);
        self.advance_leaps(dt, out_events);
        self.advance_flights(dt, out_events);
        self.advance_projectiles(dt, out_events);
        self.advance_fades(dt, out_events);
    }

    fn advance_walks(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let walks = std::mem::take(&mut self.motions.walks);
        let step = self.timings.step_duration;
        let mut pending = Vec::with_capacity(walks.len());

        for mut walk in walks {
            walk.elapsed = walk.elapsed.saturating_add(dt);
            while walk.next < walk.path.len() && walk.elapsed >= step {
                walk.elapsed -= step;
                out_events.push(Event::EntityStepped {
                    entity: walk.entity,
                    tile: walk.path[walk.next],
                });
                walk.next += 1;
            }
            if walk.next < walk.path.len() {
                pending.push(walk);
            } else {
                self.finish_walk(&walk, out_events);
            }
        }

        pending.append(&mut self.motions.walks);
        self.motions.walks = pending;
    }

    fn finish_walk(&mut self, walk: &Walk, out_events: &mut Vec<Event>) {
        let entity = walk.entity;
        let grounded = self
            .entities
            .get(entity)
            .and_then(|state| state.grounded_tile());
        let destination = walk.path.last().copied();

        match (grounded, destination) {
            (Some(origin), Some(destination))
                if origin == walk.origin && destination != origin =>
            {
                if self.grid.is_occupied(destination) {
                    log::warn!("{entity:?} found {destination:?} taken at the end of its walk");
                } else {
                    let _ = self.grid.vacate(origin, entity);
                    let _ = self.grid.occupy(destination, entity);
                    if let Some(state) = self.entities.get_mut(entity) {
                        state.tile = Some(destination);
                    }
                    out_events.push(Event::EntityMoved {
                        entity,
                        from: origin,
                        to: destination,
                    });
                }
            }
            _ => log::debug!("{entity:?} walk ended without relocating"),
        }

        out_events.push(Event::ActionCompleted { entity });
    }

    fn advance_leaps(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let leaps = std::mem::take(&mut self.motions.leaps);
        let mut pending = Vec::with_capacity(leaps.len());

        for mut leap in leaps {
            leap.elapsed = leap.elapsed.saturating_add(dt);
            if leap.elapsed < leap.duration {
                pending.push(leap);
            } else {
                self.land_leap(&leap, out_events);
            }
        }

        pending.append(&mut self.motions.leaps);
        self.motions.leaps = pending;
    }

    fn land_leap(&mut self, leap: &Leap, out_events: &mut Vec<Event>) {
        let entity = leap.entity;
        let Some(strength) = self
            .entities
            .get(entity)
            .filter(|state| !state.dead)
            .map(|state| state.strength)
        else {
            return;
        };

        for (dx, dy) in SURROUNDING_OFFSETS {
            let tile = leap.to.offset(dx, dy);
            if let Some(occupant) = self.grid.occupant(tile) {
                self.damage_entity(occupant, strength, out_events);
            }
        }

        if let Some(occupant) = self.grid.occupant(leap.to) {
            // Whoever stands on the landing tile is hit and knocked aside.
            let axis = Direction::toward(leap.from, leap.to)
                .unwrap_or_else(|| Direction::horizontal(leap.to.x() - leap.from.x()));
            self.damage_entity(occupant, strength, out_events);
            self.throw_entity(occupant, leap.to.step(axis.opposite()), out_events);
        }

        let landing = if self.grid.occupy(leap.to, entity) {
            leap.to
        } else {
            log::error!("{entity:?} could not claim leap landing {:?}", leap.to);
            let _ = self.grid.occupy(leap.from, entity);
            leap.from
        };
        if let Some(state) = self.entities.get_mut(entity) {
            state.tile = Some(landing);
            state.being_thrown = false;
        }
        out_events.push(Event::EntityLeapt {
            entity,
            from: leap.from,
            to: leap.to,
        });
        out_events.push(Event::ActionCompleted { entity });
    }

    fn advance_flights(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let flights = std::mem::take(&mut self.motions.flights);
        let mut pending = Vec::with_capacity(flights.len());

        for mut flight in flights {
            flight.elapsed = flight.elapsed.saturating_add(dt);

            if !flight.chain_checked
                && flight.elapsed > flight.duration.mul_f32(self.timings.chain_check_fraction)
            {
                flight.chain_checked = true;
                self.clear_landing(&flight, out_events);
            }

            if flight.elapsed >= flight.duration.saturating_add(self.timings.landing_settle) {
                self.land_flight(&flight, out_events);
            } else {
                pending.push(flight);
            }
        }

        pending.append(&mut self.motions.flights);
        self.motions.flights = pending;
    }

    /// Throws whatever stands on the flight's landing tile onward.
    fn clear_landing(&mut self, flight: &Flight, out_events: &mut Vec<Event>) {
        let alive = self
            .entities
            .get(flight.entity)
            .map_or(false, |state| !state.dead);
        if !alive {
            return;
        }
        if let Some(occupant) = self.grid.occupant(flight.to) {
            if occupant != flight.entity {
                self.throw_entity(occupant, flight.from, out_events);
            }
        }
    }

    fn land_flight(&mut self, flight: &Flight, out_events: &mut Vec<Event>) {
        let entity = flight.entity;
        let alive = self
            .entities
            .get(entity)
            .map_or(false, |state| !state.dead);
        if !alive {
            return;
        }

        if self.grid.occupy(flight.to, entity) {
            if let Some(state) = self.entities.get_mut(entity) {
                state.tile = Some(flight.to);
                state.being_thrown = false;
            }
            out_events.push(Event::EntityLanded {
                entity,
                tile: flight.to,
            });
        } else {
            log::warn!("{entity:?} has nowhere to land on {:?}", flight.to);
            out_events.push(Event::EntityStranded {
                entity,
                tile: flight.from,
            });
        }
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let projectiles = std::mem::take(&mut self.motions.projectiles);
        let mut pending = Vec::with_capacity(projectiles.len());

        for mut projectile in projectiles {
            projectile.travelled += projectile.speed * dt.as_secs_f32();
            if self.trace_projectile(&mut projectile, out_events) {
                pending.push(projectile);
            }
        }

        pending.append(&mut self.motions.projectiles);
        self.motions.projectiles = pending;
    }

    /// Steps the projectile head through every tile boundary it crossed.
    /// Returns `false` once the projectile detonated.
    fn trace_projectile(&mut self, projectile: &mut Projectile, out_events: &mut Vec<Event>) -> bool {
        while projectile.travelled > 1.0 {
            let previous = projectile.head;
            projectile.head = projectile.head.step(projectile.direction);
            projectile.travelled -= 1.0;

            if !self.grid.contains(projectile.head) {
                out_events.push(Event::ProjectileDetonated {
                    projectile: projectile.id,
                    shooter: projectile.shooter,
                    tile: None,
                    struck: None,
                });
                return false;
            }
            out_events.push(Event::ProjectileAdvanced {
                projectile: projectile.id,
                tile: projectile.head,
            });

            let Some(occupant) = self.grid.occupant(projectile.head) else {
                continue;
            };
            out_events.push(Event::ProjectileDetonated {
                projectile: projectile.id,
                shooter: projectile.shooter,
                tile: Some(projectile.head),
                struck: Some(occupant),
            });
            let shoved = self
                .entities
                .get(occupant)
                .map_or(false, |state| state.kind.is_throwable_by_shove());
            if projectile.shooter_kind == EntityKind::Player && shoved
            {
                self.throw_entity(occupant, previous, out_events);
            } else {
                self.damage_entity(occupant, projectile.strength, out_events);
            }
            return false;
        }
        true
    }

    fn advance_fades(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let fades = std::mem::take(&mut self.motions.fades);
        let mut pending = Vec::with_capacity(fades.len());
        let mut expired = Vec::new();

        for mut fade in fades {
            fade.remaining = fade.remaining.saturating_sub(dt);
            if fade.remaining.is_zero() {
                expired.push(fade.entity);
            } else {
                pending.push(fade);
            }
        }

        pending.append(&mut self.motions.fades);
        self.motions.fades = pending;
        for entity in expired {
            self.despawn(entity, out_events);
        }
    }
}

/// Time needed to cover `distance` tiles at `speed` tiles per second.
fn travel_time(distance: f32, speed: f32) -> Duration {
    if speed <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(distance / speed).unwrap_or(Duration::ZERO)
}
