//! Fixed-capacity object pool with lazy defragmentation.
//!
//! Every slot is constructed once, up front, and then flipped between enabled
//! and disabled in place. Enabling hands out the slot under the
//! `enable_index` cursor and advances it; disabling only clears a flag. Once
//! the cursor reaches the last slot and that slot is taken, the next request
//! compacts enabled slots into a prefix of the array before retrying. Slots
//! keep the handle they were created with for their whole life even though
//! compaction moves them around.

use std::{fmt, ops::Index};

use thiserror::Error;
use tracing::debug;
use worm_bricks_core::{BlockId, FruitId, ModuleId, WormId};

/// Stable identifier handed out by a [`Pool`].
///
/// The raw value equals the slot's array position at construction time.
pub trait Handle: Copy + Eq + fmt::Debug {
    /// Builds a handle from its raw slot number.
    fn from_raw(raw: u32) -> Self;

    /// Raw slot number backing the handle.
    fn raw(self) -> u32;
}

macro_rules! impl_handle {
    ($($id:ty),* $(,)?) => {
        $(
            impl Handle for $id {
                fn from_raw(raw: u32) -> Self {
                    Self::new(raw)
                }

                fn raw(self) -> u32 {
                    self.get()
                }
            }
        )*
    };
}

impl_handle!(WormId, ModuleId, BlockId, FruitId);

/// Hooks invoked when the pool flips a slot between lifecycle states.
///
/// Drawables attached to a poolable use these to show or hide themselves.
pub trait Poolable {
    /// Called right after the slot is handed out.
    fn on_enable(&mut self) {}

    /// Called right after the slot is returned.
    fn on_disable(&mut self) {}
}

/// Reasons a pool cannot be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Pools need at least one slot.
    #[error("pool capacity must be at least one")]
    ZeroCapacity,
    /// Handles are 32-bit.
    #[error("pool capacity {0} exceeds the handle range")]
    CapacityTooLarge(usize),
}

/// Entry of the pool's backing array.
#[derive(Clone, Debug)]
pub struct Slot<K, T> {
    id: K,
    enabled: bool,
    value: T,
}

impl<K: Handle, T> Slot<K, T> {
    /// Stable handle of the slot.
    pub fn id(&self) -> K {
        self.id
    }

    /// Reports whether the slot is currently handed out.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Payload stored in the slot. Stale while the slot is disabled.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Fixed-capacity array of pre-allocated poolables.
#[derive(Clone, Debug)]
pub struct Pool<K, T> {
    slots: Vec<Slot<K, T>>,
    positions: Vec<usize>,
    enable_index: usize,
    end_index: usize,
    enabled: usize,
}

impl<K: Handle, T> Pool<K, T> {
    /// Allocates `capacity` disabled slots, building each payload from its handle.
    pub fn new<F>(capacity: usize, mut factory: F) -> Result<Self, PoolError>
    where
        F: FnMut(K) -> T,
    {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if u32::try_from(capacity).is_err() {
            return Err(PoolError::CapacityTooLarge(capacity));
        }

        let slots = (0..capacity)
            .map(|index| {
                let id = K::from_raw(index as u32);
                Slot {
                    id,
                    enabled: false,
                    value: factory(id),
                }
            })
            .collect();

        Ok(Self {
            slots,
            positions: (0..capacity).collect(),
            enable_index: 0,
            end_index: capacity - 1,
            enabled: 0,
        })
    }

    /// Number of slots, enabled or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of enabled slots.
    pub fn len(&self) -> usize {
        self.enabled
    }

    /// Reports whether no slot is enabled.
    pub fn is_empty(&self) -> bool {
        self.enabled == 0
    }

    /// First array position that may be free.
    pub fn enable_index(&self) -> usize {
        self.enable_index
    }

    /// Reports whether the slot behind `id` is enabled.
    pub fn is_enabled(&self, id: K) -> bool {
        self.position(id)
            .map_or(false, |position| self.slots[position].enabled)
    }

    /// Current array position of the slot behind `id`.
    pub fn position(&self, id: K) -> Option<usize> {
        self.positions.get(id.raw() as usize).copied()
    }

    /// Payload of an enabled slot.
    pub fn get(&self, id: K) -> Option<&T> {
        let slot = &self.slots[self.position(id)?];
        slot.enabled.then_some(&slot.value)
    }

    /// Mutable payload of an enabled slot.
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        let position = self.position(id)?;
        let slot = &mut self.slots[position];
        if slot.enabled {
            Some(&mut slot.value)
        } else {
            None
        }
    }

    /// Slot currently stored at an array position.
    pub fn at(&self, position: usize) -> Option<&Slot<K, T>> {
        self.slots.get(position)
    }

    /// Handle of the enabled slot at an array position.
    pub fn enabled_at(&self, position: usize) -> Option<K> {
        self.at(position)
            .filter(|slot| slot.enabled)
            .map(|slot| slot.id)
    }

    /// Forward traversal over the whole backing array, disabled slots included.
    pub fn iter(&self) -> impl Iterator<Item = &Slot<K, T>> {
        self.slots.iter()
    }

    /// Enabled slots in array order.
    pub fn iter_enabled(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| (slot.id, &slot.value))
    }

    /// Reports whether at least `count` slots are free, compacting first if
    /// the slots past the cursor are not enough.
    pub fn has_available(&mut self, count: usize) -> bool {
        if self.free_past_cursor() >= count {
            return true;
        }
        self.defragment();
        self.free_past_cursor() >= count
    }

    /// Moves every enabled slot into a prefix of the array.
    ///
    /// A front pointer walks up from zero looking for disabled slots while a
    /// back pointer walks down from the cursor looking for enabled ones; each
    /// pair found is swapped. Neither pointer revisits a position, so a pass
    /// is linear in the cursor position. Afterwards the cursor rests on the
    /// first disabled slot, or on the last slot when the pool is full.
    pub fn defragment(&mut self) {
        let mut front = 0;
        let mut back = self.enable_index;
        loop {
            while front <= back && self.slots[front].enabled {
                front += 1;
            }
            while back > front && !self.slots[back].enabled {
                back -= 1;
            }
            if front >= back {
                break;
            }
            self.swap(front, back);
            front += 1;
            back -= 1;
        }

        let previous = self.enable_index;
        self.enable_index = front.min(self.end_index);
        debug!(
            capacity = self.capacity(),
            enabled = self.enabled,
            previous,
            enable_index = self.enable_index,
            "pool defragmented"
        );
    }

    fn free_past_cursor(&self) -> usize {
        let tail = self.end_index - self.enable_index;
        if self.slots[self.enable_index].enabled {
            tail
        } else {
            tail + 1
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        self.positions[self.slots[a].id.raw() as usize] = a;
        self.positions[self.slots[b].id.raw() as usize] = b;
    }
}

impl<K: Handle, T: Poolable> Pool<K, T> {
    /// Hands out the next free slot, or `None` when every slot is enabled.
    pub fn enable(&mut self) -> Option<K> {
        if self.slots[self.enable_index].enabled {
            debug_assert_eq!(self.enable_index, self.end_index);
            self.defragment();
            if self.slots[self.enable_index].enabled {
                debug!(capacity = self.capacity(), "pool exhausted");
                return None;
            }
        }

        let slot = &mut self.slots[self.enable_index];
        slot.enabled = true;
        slot.value.on_enable();
        let id = slot.id;
        self.enabled += 1;
        if self.enable_index < self.end_index {
            self.enable_index += 1;
        }
        Some(id)
    }

    /// Returns a slot to the pool. Reports whether it was enabled.
    pub fn disable(&mut self, id: K) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        let slot = &mut self.slots[position];
        if !slot.enabled {
            return false;
        }
        slot.enabled = false;
        slot.value.on_disable();
        self.enabled -= 1;
        true
    }
}

impl<K, T> Index<usize> for Pool<K, T> {
    type Output = Slot<K, T>;

    fn index(&self, position: usize) -> &Self::Output {
        &self.slots[position]
    }
}
