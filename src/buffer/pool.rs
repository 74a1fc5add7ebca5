//! Fixed-Capacity Object Pool
//!
//! A slab of `capacity` slots allocated once up front. Unused slots form an
//! intrusive free list: each free slot stores the index of the next free
//! slot, and `free_head` points at the first one (`None` means full).
//!
//! Allocations hand out generational handles, the same pattern as entity
//! ids: every slot has a generation counter that increments when the slot
//! is freed, so a handle to a freed value never matches the value that
//! later reuses the slot.
//!
//! The pool never grows. Exhaustion is reported as [`PoolError::Exhausted`]
//! and the caller decides what to do with the rejected request.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use tracing::warn;

/// Largest capacity a pool accepts (slot indices are `u32`).
pub const MAX_POOL_CAPACITY: usize = u32::MAX as usize;

/// Error type for pool operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool must have at least one slot
    ZeroCapacity,
    /// Requested capacity does not fit in a `u32` slot index
    CapacityTooLarge(usize),
    /// Every slot is live
    Exhausted { capacity: usize },
    /// The handle points to a freed slot or to a slot reused by a newer value
    StaleHandle { index: u32, generation: u32 },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::ZeroCapacity => write!(f, "pool capacity must be non-zero"),
            PoolError::CapacityTooLarge(c) => {
                write!(f, "pool capacity {} exceeds maximum {}", c, MAX_POOL_CAPACITY)
            }
            PoolError::Exhausted { capacity } => write!(f, "pool is full ({} slots)", capacity),
            PoolError::StaleHandle { index, generation } => {
                write!(f, "stale handle (slot {}, generation {})", index, generation)
            }
        }
    }
}

impl std::error::Error for PoolError {}

/// A reference to a value stored in a [`Pool<T>`].
///
/// Consists of a slot index and the generation of that slot at allocation
/// time. Two handles with the same index but different generations refer
/// to different values.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, _marker: PhantomData }
    }

    /// Slot index inside the pool
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: deriving would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

/// Slot state: either a link in the free list or a live value
enum Slot<T> {
    Free { next: Option<u32> },
    Live(T),
}

struct Entry<T> {
    generation: u32,
    slot: Slot<T>,
}

/// Fixed-capacity free-list allocator for same-typed records.
pub struct Pool<T> {
    entries: Vec<Entry<T>>,
    /// First free slot, `None` when every slot is live
    free_head: Option<u32>,
    live_count: u32,
}

impl<T> Pool<T> {
    /// Create a pool with exactly `capacity` slots, all free.
    ///
    /// Slot `i` links to slot `i + 1`; the last slot ends the list.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if capacity > MAX_POOL_CAPACITY {
            return Err(PoolError::CapacityTooLarge(capacity));
        }

        let last = capacity - 1;
        let entries = (0..capacity)
            .map(|i| Entry {
                generation: 0,
                slot: Slot::Free {
                    next: if i == last { None } else { Some(i as u32 + 1) },
                },
            })
            .collect();

        Ok(Self {
            entries,
            free_head: Some(0),
            live_count: 0,
        })
    }

    /// Pop the head of the free list and store `value` there.
    pub fn alloc(&mut self, value: T) -> Result<Handle<T>, PoolError> {
        self.try_alloc(value).map_err(|_| PoolError::Exhausted { capacity: self.capacity() })
    }

    /// Like [`Pool::alloc`], but a full pool hands `value` back.
    pub fn try_alloc(&mut self, value: T) -> Result<Handle<T>, T> {
        let index = match self.free_head {
            Some(index) => index,
            None => {
                warn!(capacity = self.capacity(), "pool is full");
                return Err(value);
            }
        };

        let entry = &mut self.entries[index as usize];
        let next = match entry.slot {
            Slot::Free { next } => next,
            // The free list only ever links free slots
            Slot::Live(_) => unreachable!("free list points at live slot {}", index),
        };

        entry.slot = Slot::Live(value);
        self.free_head = next;
        self.live_count += 1;
        Ok(Handle::new(index, entry.generation))
    }

    /// Push the slot behind `handle` back onto the head of the free list and
    /// return the value that lived there.
    ///
    /// Freeing twice, or freeing through a handle whose slot was reused,
    /// returns [`PoolError::StaleHandle`] and leaves the pool untouched.
    pub fn free(&mut self, handle: Handle<T>) -> Result<T, PoolError> {
        if !self.contains(handle) {
            return Err(PoolError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            });
        }

        let entry = &mut self.entries[handle.index as usize];
        let slot = std::mem::replace(&mut entry.slot, Slot::Free { next: self.free_head });
        entry.generation = entry.generation.wrapping_add(1);
        self.free_head = Some(handle.index);
        self.live_count -= 1;

        match slot {
            Slot::Live(value) => Ok(value),
            Slot::Free { .. } => unreachable!("contains() checked the slot is live"),
        }
    }

    /// Check if `handle` refers to a live value.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        match self.entries.get(handle.index as usize) {
            Some(entry) => {
                entry.generation == handle.generation && matches!(entry.slot, Slot::Live(_))
            }
            None => false,
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let entry = self.entries.get(handle.index as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        match &entry.slot {
            Slot::Live(value) => Some(value),
            Slot::Free { .. } => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        match &mut entry.slot {
            Slot::Live(value) => Some(value),
            Slot::Free { .. } => None,
        }
    }

    /// The `n`th live value in slot order.
    ///
    /// This is the same order [`Pool::iter`] yields, so `try_get(i)` for
    /// `i in 0..live_count()` visits every live value exactly once.
    pub fn try_get(&self, n: usize) -> Option<(Handle<T>, &T)> {
        self.iter().nth(n)
    }

    /// Iterate over live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| match &entry.slot {
                Slot::Live(value) => Some((Handle::new(idx as u32, entry.generation), value)),
                Slot::Free { .. } => None,
            })
    }

    /// Iterate mutably over live values in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let generation = entry.generation;
                match &mut entry.slot {
                    Slot::Live(value) => Some((Handle::new(idx as u32, generation), value)),
                    Slot::Free { .. } => None,
                }
            })
    }

    /// Snapshot of live handles in slot order.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Walk the free list from its head, yielding slot indices.
    pub fn free_slots(&self) -> FreeSlots<'_, T> {
        FreeSlots {
            pool: self,
            cursor: self.free_head,
            remaining: self.entries.len(),
        }
    }

    /// Free every live slot, returning the values in slot order.
    ///
    /// All outstanding handles become stale.
    pub fn drain(&mut self) -> Vec<T> {
        let handles = self.handles();
        let mut values = Vec::with_capacity(handles.len());
        // Free in reverse so the rebuilt list starts at the lowest slot again
        for handle in handles.into_iter().rev() {
            if let Ok(value) = self.free(handle) {
                values.push(value);
            }
        }
        values.reverse();
        values
    }

    /// Free every live slot, dropping the values.
    pub fn clear(&mut self) {
        self.drain();
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn live_count(&self) -> usize {
        self.live_count as usize
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.live_count()
    }

    pub fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}

/// Iterator over the free list, see [`Pool::free_slots`].
pub struct FreeSlots<'a, T> {
    pool: &'a Pool<T>,
    cursor: Option<u32>,
    /// Guards against a corrupted (cyclic) list
    remaining: usize,
}

impl<T> Iterator for FreeSlots<'_, T> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let index = self.cursor?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.cursor = match self.pool.entries.get(index as usize).map(|e| &e.slot) {
            Some(Slot::Free { next }) => *next,
            _ => None,
        };
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Live handles and the free list must partition the slots.
    fn assert_integrity<T>(pool: &Pool<T>, live: &[Handle<T>]) {
        let free: HashSet<u32> = pool.free_slots().collect();
        let used: HashSet<u32> = live.iter().map(|h| h.index()).collect();
        assert!(free.is_disjoint(&used));
        assert_eq!(free.len() + used.len(), pool.capacity());
        assert_eq!(pool.live_count(), live.len());
        assert_eq!(pool.free_count(), free.len());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(Pool::<u8>::new(0).err(), Some(PoolError::ZeroCapacity));
    }

    #[test]
    fn test_fresh_pool_links_every_slot() {
        let pool: Pool<u8> = Pool::new(4).unwrap();
        let free: Vec<u32> = pool.free_slots().collect();
        assert_eq!(free, vec![0, 1, 2, 3]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_alloc_and_free() {
        let mut pool = Pool::new(3).unwrap();

        let a = pool.alloc("a").unwrap();
        let b = pool.alloc("b").unwrap();
        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.get(b), Some(&"b"));

        assert_eq!(pool.free(a), Ok("a"));
        assert_eq!(pool.live_count(), 1);
        assert!(!pool.contains(a));
        assert!(pool.contains(b));
        assert_integrity(&pool, &[b]);
    }

    #[test]
    fn test_exhaustion_and_recovery() {
        let mut pool = Pool::new(3).unwrap();
        let handles: Vec<_> = (0..3).map(|i| pool.alloc(i).unwrap()).collect();
        assert!(pool.is_full());
        assert_eq!(pool.alloc(3), Err(PoolError::Exhausted { capacity: 3 }));

        pool.free(handles[1]).unwrap();
        let again = pool.alloc(4).unwrap();
        assert_eq!(again.index(), 1);
        assert_eq!(pool.get(again), Some(&4));
    }

    #[test]
    fn test_double_free_detected() {
        let mut pool = Pool::new(2).unwrap();
        let a = pool.alloc(1).unwrap();
        pool.free(a).unwrap();
        assert!(matches!(pool.free(a), Err(PoolError::StaleHandle { .. })));
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_slots().count(), 2);
    }

    #[test]
    fn test_generation_prevents_reuse_collision() {
        let mut pool = Pool::new(1).unwrap();
        let old = pool.alloc(10).unwrap();
        pool.free(old).unwrap();

        // Same slot, new generation
        let new = pool.alloc(20).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert_eq!(pool.get(old), None);
        assert_eq!(pool.get(new), Some(&20));
    }

    #[test]
    fn test_free_list_integrity_under_churn() {
        let mut pool = Pool::new(8).unwrap();
        let mut live = Vec::new();

        // Deterministic interleaving of allocs and frees
        for step in 0..64u32 {
            if step % 3 == 2 && !live.is_empty() {
                let victim = live.remove((step as usize * 7) % live.len());
                pool.free(victim).unwrap();
            } else if !pool.is_full() {
                live.push(pool.alloc(step).unwrap());
            }
            assert_integrity(&pool, &live);
        }
    }

    #[test]
    fn test_try_get_walks_live_slots_in_order() {
        let mut pool = Pool::new(4).unwrap();
        let a = pool.alloc('a').unwrap();
        let b = pool.alloc('b').unwrap();
        let _c = pool.alloc('c').unwrap();
        pool.free(b).unwrap();

        assert_eq!(pool.try_get(0).map(|(_, v)| *v), Some('a'));
        assert_eq!(pool.try_get(1).map(|(_, v)| *v), Some('c'));
        assert!(pool.try_get(2).is_none());
        assert_eq!(pool.try_get(0).map(|(h, _)| h), Some(a));
    }

    #[test]
    fn test_drain_invalidates_handles() {
        let mut pool = Pool::new(3).unwrap();
        let a = pool.alloc(1).unwrap();
        let b = pool.alloc(2).unwrap();

        assert_eq!(pool.drain(), vec![1, 2]);
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
        assert!(!pool.contains(b));
        assert_eq!(pool.free_slots().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_try_alloc_returns_value_when_full() {
        let mut pool: Pool<String> = Pool::new(1).unwrap();
        let first = pool.try_alloc("kept".to_string()).unwrap();
        assert_eq!(pool.try_alloc("spare".to_string()), Err("spare".to_string()));
        assert_eq!(pool.get(first).map(String::as_str), Some("kept"));
        assert_eq!(pool.live_count(), 1);
    }
}
