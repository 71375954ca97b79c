//! Fixed-capacity entity pools
//!
//! Every slot is allocated once at construction. Acquire/release flip the
//! active flag; releasing also bumps the slot generation so a handle kept
//! past its release can no longer reach the slot. Recycling moves an active
//! entity without touching its generation, so its identity survives.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{EntityKind, EntityView, PooledEntity};
use super::patterns::SpawnDescriptor;
use crate::error::{Result, SimError};
use crate::lane_x;
use crate::settings::PoolSettings;

/// How far behind an entity may fall before it is moved, and where it goes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecycleSpan {
    /// Entities anchored this far behind the player move to the front
    pub distance: f32,
    /// Gap between the current front and the moved entity
    pub spacing: f32,
    /// Random extra gap, `0..jitter`
    pub jitter: f32,
}

/// Values stored in an arena must know how to scrub themselves on release
pub trait Poolable {
    fn reset(&mut self);
}

impl Poolable for PooledEntity {
    fn reset(&mut self) {
        PooledEntity::reset(self);
    }
}

/// Stable address of an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotHandle {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    active: bool,
}

/// Generational arena of fixed size
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    /// Next index to try on acquire
    cursor: usize,
    active: usize,
}

impl<T: Poolable> Arena<T> {
    pub fn new(capacity: usize, mut init: impl FnMut() -> T) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                value: init(),
                generation: 0,
                active: false,
            })
            .collect();
        Self {
            slots,
            cursor: 0,
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_full(&self) -> bool {
        self.active >= self.slots.len()
    }

    /// Claim an inactive slot, probing round-robin from the cursor
    pub fn acquire(&mut self) -> Option<(SlotHandle, &mut T)> {
        let cap = self.slots.len();
        if self.active >= cap {
            return None;
        }
        let idx = (0..cap)
            .map(|i| (self.cursor + i) % cap)
            .find(|&i| !self.slots[i].active)?;
        self.cursor = (idx + 1) % cap;
        self.active += 1;
        let slot = &mut self.slots[idx];
        slot.active = true;
        let handle = SlotHandle {
            index: idx as u32,
            generation: slot.generation,
        };
        Some((handle, &mut slot.value))
    }

    /// Return a slot to the free set. Stale handles are ignored.
    pub fn release(&mut self, handle: SlotHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if !slot.active || slot.generation != handle.generation {
            return false;
        }
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.value.reset();
        self.active -= 1;
        true
    }

    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    /// Active slots in index order
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.active).map(|(i, s)| {
            (
                SlotHandle {
                    index: i as u32,
                    generation: s.generation,
                },
                &s.value,
            )
        })
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (SlotHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| {
                (
                    SlotHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &mut s.value,
                )
            })
    }
}

/// Handle into the entity pool (kind selects the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub kind: EntityKind,
    pub slot: SlotHandle,
}

/// One arena per entity kind
#[derive(Debug, Clone)]
pub struct EntityPool {
    arenas: [Arena<PooledEntity>; 4],
}

impl EntityPool {
    pub fn new(settings: &PoolSettings) -> Self {
        let make = |kind: EntityKind| {
            let cap = settings.capacity(kind);
            Arena::new(cap, || PooledEntity::new(kind))
        };
        Self {
            arenas: EntityKind::ALL.map(make),
        }
    }

    fn arena(&self, kind: EntityKind) -> &Arena<PooledEntity> {
        &self.arenas[kind.index()]
    }

    fn arena_mut(&mut self, kind: EntityKind) -> &mut Arena<PooledEntity> {
        &mut self.arenas[kind.index()]
    }

    pub fn capacity(&self, kind: EntityKind) -> usize {
        self.arena(kind).capacity()
    }

    pub fn active_count(&self, kind: EntityKind) -> usize {
        self.arena(kind).active_count()
    }

    /// Claim an inactive slot of `kind`
    pub fn acquire(&mut self, kind: EntityKind) -> Result<EntityHandle> {
        let (slot, entity) = self
            .arena_mut(kind)
            .acquire()
            .ok_or(SimError::PoolExhausted(kind))?;
        entity.active = true;
        Ok(EntityHandle { kind, slot })
    }

    pub fn release(&mut self, handle: EntityHandle) -> bool {
        self.arena_mut(handle.kind).release(handle.slot)
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&PooledEntity> {
        self.arena(handle.kind).get(handle.slot)
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut PooledEntity> {
        self.arena_mut(handle.kind).get_mut(handle.slot)
    }

    /// Populate a slot from a pattern descriptor
    pub fn realize(
        &mut self,
        desc: &SpawnDescriptor,
        player_z: f32,
        variant_seed: u32,
    ) -> Result<EntityHandle> {
        let handle = self.acquire(desc.kind)?;
        if let Some(entity) = self.get_mut(handle) {
            entity.payload = desc.payload;
            entity.variant_seed = variant_seed;
            entity.anim_time = 0.0;
            entity.place(Vec3::new(lane_x(desc.lane), desc.height, player_z - desc.offset));
        }
        Ok(handle)
    }

    /// Move every entity of `kind` that fell more than `span.distance`
    /// behind the player to the front of the same-kind set, then let
    /// `regenerate` re-roll its attributes. Returns how many moved.
    ///
    /// The frontmost z is rescanned for each move so two recycled entities
    /// never land on the same spot.
    pub fn recycle_behind<R, F>(
        &mut self,
        kind: EntityKind,
        player_z: f32,
        span: RecycleSpan,
        rng: &mut R,
        mut regenerate: F,
    ) -> usize
    where
        R: Rng + ?Sized,
        F: FnMut(&mut PooledEntity, &mut R),
    {
        let arena = self.arena_mut(kind);
        let stale: Vec<SlotHandle> = arena
            .iter_active()
            .filter(|(_, e)| e.anchor.z > player_z + span.distance)
            .map(|(h, _)| h)
            .collect();

        for handle in &stale {
            let front_z = arena
                .iter_active()
                .map(|(_, e)| e.anchor.z)
                .fold(f32::INFINITY, f32::min);
            let jitter = if span.jitter > 0.0 {
                rng.random_range(0.0..span.jitter)
            } else {
                0.0
            };
            if let Some(entity) = arena.get_mut(*handle) {
                let mut anchor = entity.anchor;
                anchor.z = front_z - span.spacing - jitter;
                entity.place(anchor);
                regenerate(entity, rng);
            }
        }
        stale.len()
    }

    /// Release transient entities that fell `distance` behind the player
    pub fn release_behind(&mut self, player_z: f32, distance: f32) -> usize {
        let mut released = 0;
        for kind in [EntityKind::Obstacle, EntityKind::Coin, EntityKind::PowerUp] {
            let behind: Vec<SlotHandle> = self
                .arena(kind)
                .iter_active()
                .filter(|(_, e)| e.anchor.z > player_z + distance)
                .map(|(h, _)| h)
                .collect();
            for slot in behind {
                if self.release(EntityHandle { kind, slot }) {
                    released += 1;
                }
            }
        }
        released
    }

    /// Advance per-entity animation
    pub fn animate(&mut self, dt: f32) {
        for arena in &mut self.arenas {
            for (_, entity) in arena.iter_active_mut() {
                entity.animate(dt);
            }
        }
    }

    /// Active entities of one kind with their handles
    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = (EntityHandle, &PooledEntity)> {
        self.arena(kind)
            .iter_active()
            .map(move |(slot, e)| (EntityHandle { kind, slot }, e))
    }

    /// Read-only transforms of everything currently in play
    pub fn views(&self) -> Vec<EntityView> {
        EntityKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.iter_kind(kind).map(move |(handle, e)| EntityView {
                    handle,
                    kind,
                    position: e.position,
                    payload: e.payload,
                    variant_seed: e.variant_seed,
                })
            })
            .collect()
    }
}
