//! Binary heap with a handle → slot index.
//!
//! Besides the usual insert / extract-root, the index allows removing or
//! re-prioritising any item in O(log n). Items are designated by the
//! [`Handle`] returned at insertion, so the comparable value itself is free
//! to change.

use std::collections::HashMap;
use std::mem;

use derivative::Derivative;

use crate::base::{Handle, HandleAllocator, HeapError, Result};

/// Which item sits at the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest item at the root
    #[default]
    Min,
    /// Largest item at the root
    Max,
}

impl Direction {
    /// Returns true if `a` must be placed above `b`
    #[inline]
    fn precedes<T: Ord>(self, a: &T, b: &T) -> bool {
        match self {
            Direction::Min => a < b,
            Direction::Max => a > b,
        }
    }
}

#[derive(Derivative, Clone, Debug)]
#[derivative(Default)]
pub struct HeapOptions {
    /// Number of slots reserved up-front (storage doubles when full)
    #[derivative(Default(value = "10"))]
    pub initial_capacity: usize,

    pub direction: Direction,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    handle: Handle,
    item: T,
}

#[derive(Debug, Clone)]
pub struct IndexableBinaryHeap<T> {
    /// Complete binary tree: children of i are 2i+1 and 2i+2
    storage: Vec<Slot<T>>,

    /// position[storage[i].handle] == i for every live slot
    position: HashMap<Handle, usize>,

    direction: Direction,
    handles: HandleAllocator,
}

#[inline]
fn parent(slot: usize) -> usize {
    (slot - 1) / 2
}

#[inline]
fn left_child(slot: usize) -> usize {
    2 * slot + 1
}

impl<T: Ord> IndexableBinaryHeap<T> {
    pub fn new_min() -> Self {
        Self::with_options(&HeapOptions::default())
    }

    pub fn new_max() -> Self {
        Self::with_options(&HeapOptions {
            direction: Direction::Max,
            ..Default::default()
        })
    }

    pub fn with_options(options: &HeapOptions) -> Self {
        Self {
            storage: Vec::with_capacity(options.initial_capacity),
            position: HashMap::with_capacity(options.initial_capacity),
            direction: options.direction,
            handles: HandleAllocator::default(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Adds an item and returns the handle designating it
    pub fn insert(&mut self, item: T) -> Handle {
        let handle = self.handles.allocate();
        self.push(handle, item);
        handle
    }

    /// Adds an item under a handle allocated elsewhere
    pub(crate) fn insert_entry(&mut self, handle: Handle, item: T) -> Result<()> {
        if self.position.contains_key(&handle) {
            return Err(HeapError::InvalidArgument(format!(
                "item {} is already in the heap",
                handle
            )));
        }
        self.handles.reserve(handle);
        self.push(handle, item);
        Ok(())
    }

    fn push(&mut self, handle: Handle, item: T) {
        let slot = self.storage.len();
        self.storage.push(Slot { handle, item });
        self.position.insert(handle, slot);
        self.sift_up(slot);
    }

    /// Removes the root and returns it together with its handle
    pub fn extract_root_entry(&mut self) -> Result<(Handle, T)> {
        if self.storage.is_empty() {
            return Err(HeapError::EmptyStructure);
        }

        let last = self.storage.len() - 1;
        self.storage.swap(0, last);
        let root = self.storage.pop().ok_or(HeapError::EmptyStructure)?;
        self.position.remove(&root.handle);

        if !self.storage.is_empty() {
            self.position.insert(self.storage[0].handle, 0);
            self.sift_down(0);
        }
        Ok((root.handle, root.item))
    }

    pub fn extract_root(&mut self) -> Result<T> {
        self.extract_root_entry().map(|(_, item)| item)
    }

    pub fn peek_root_entry(&self) -> Result<(Handle, &T)> {
        self.storage
            .first()
            .map(|slot| (slot.handle, &slot.item))
            .ok_or(HeapError::EmptyStructure)
    }

    pub fn peek_root(&self) -> Result<&T> {
        self.peek_root_entry().map(|(_, item)| item)
    }

    /// Removes an arbitrary item
    pub fn remove_item(&mut self, handle: Handle) -> Result<T> {
        let slot = self.slot_of(handle)?;

        let last = self.storage.len() - 1;
        self.storage.swap(slot, last);
        let removed = self.storage.pop().ok_or(HeapError::NotFound(handle))?;
        self.position.remove(&handle);

        if slot < self.storage.len() {
            // The former last item now fills the hole
            self.position.insert(self.storage[slot].handle, slot);
            self.restore(slot)?;
        }
        Ok(removed.item)
    }

    /// Lets `change` modify the item in place, then moves it to the
    /// place its new priority dictates
    pub fn update_priority<F>(&mut self, handle: Handle, change: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let slot = self.slot_of(handle)?;
        change(&mut self.storage[slot].item);
        self.restore(slot)
    }

    /// Replaces an item and returns the previous one
    pub fn set_priority(&mut self, handle: Handle, item: T) -> Result<T> {
        let slot = self.slot_of(handle)?;
        let previous = mem::replace(&mut self.storage[slot].item, item);
        self.restore(slot)?;
        Ok(previous)
    }

    /// Restores the heap order around a single perturbed slot
    ///
    /// Exactly one direction is taken: up if the item now beats its
    /// parent, down otherwise.
    pub(crate) fn restore(&mut self, slot: usize) -> Result<()> {
        if slot >= self.storage.len() {
            return Err(HeapError::InvalidArgument(format!(
                "slot {} out of range (size {})",
                slot,
                self.storage.len()
            )));
        }

        if slot > 0 && self.beats(slot, parent(slot)) {
            self.sift_up(slot);
        } else {
            self.sift_down(slot);
        }
        Ok(())
    }

    #[inline]
    fn beats(&self, a: usize, b: usize) -> bool {
        self.direction
            .precedes(&self.storage[a].item, &self.storage[b].item)
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let up = parent(slot);
            if !self.beats(slot, up) {
                break;
            }
            self.swap_slots(slot, up);
            slot = up;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.storage.len();
        loop {
            let left = left_child(slot);
            if left >= len {
                break;
            }
            let right = left + 1;
            let best = if right < len && self.beats(right, left) {
                right
            } else {
                left
            };

            if !self.beats(best, slot) {
                break;
            }
            self.swap_slots(slot, best);
            slot = best;
        }
    }

    /// Swaps two slots and re-points both index entries (and only those)
    #[inline]
    fn swap_slots(&mut self, a: usize, b: usize) {
        self.storage.swap(a, b);
        self.position.insert(self.storage[a].handle, a);
        self.position.insert(self.storage[b].handle, b);
    }

    fn slot_of(&self, handle: Handle) -> Result<usize> {
        self.position
            .get(&handle)
            .copied()
            .ok_or(HeapError::NotFound(handle))
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.position
            .get(&handle)
            .map(|&slot| &self.storage[slot].item)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.position.contains_key(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Allocated slots, live or not
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Live items in storage order (not sorted)
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.storage.iter().map(|slot| (slot.handle, &slot.item))
    }

    /// Unordered snapshot of the live items
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.storage.iter().map(|slot| slot.item.clone()).collect()
    }

    /// Drains the heap root first
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.len());
        while let Ok(item) = self.extract_root() {
            sorted.push(item);
        }
        sorted
    }

    /// Removes every item, keeping the allocated storage
    pub fn clear(&mut self) {
        self.storage.clear();
        self.position.clear();
    }

    /// Checks heap order and index consistency
    pub fn is_consistent(&self) -> bool {
        if self.position.len() != self.storage.len() {
            return false;
        }
        self.storage.iter().enumerate().all(|(ix, slot)| {
            self.position.get(&slot.handle) == Some(&ix) && (ix == 0 || !self.beats(ix, parent(ix)))
        })
    }
}

impl<T: Ord> Default for IndexableBinaryHeap<T> {
    fn default() -> Self {
        Self::new_min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_empty() {
        let mut heap = IndexableBinaryHeap::<i32>::new_min();
        assert_eq!(heap.extract_root(), Err(HeapError::EmptyStructure));
        assert_eq!(heap.peek_root(), Err(HeapError::EmptyStructure));
    }

    #[test]
    fn test_remove_untracked() {
        let mut heap = IndexableBinaryHeap::new_min();
        let handle = heap.insert(10);
        let stranger = Handle::from(99);
        assert_ne!(handle, stranger);
        assert_eq!(heap.remove_item(stranger), Err(HeapError::NotFound(stranger)));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek_root(), Ok(&10));
    }

    #[test]
    fn test_min_extract_order() {
        let mut heap = IndexableBinaryHeap::new_min();
        for v in [5, 1, 9, 2, 8, 3, 3, 7] {
            heap.insert(v);
            assert!(heap.is_consistent());
        }
        let mut out = Vec::new();
        while let Ok(v) = heap.extract_root() {
            assert!(heap.is_consistent());
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_max_extract_order() {
        let mut heap = IndexableBinaryHeap::new_max();
        for v in [4, 11, 0, 6] {
            heap.insert(v);
        }
        assert_eq!(heap.peek_root(), Ok(&11));
        assert_eq!(heap.into_sorted_vec(), vec![11, 6, 4, 0]);
    }

    #[test]
    fn test_storage_grows() {
        let mut heap = IndexableBinaryHeap::with_options(&HeapOptions {
            initial_capacity: 2,
            ..Default::default()
        });
        for v in (0..50).rev() {
            heap.insert(v);
        }
        assert!(heap.capacity() >= 50);
        assert_eq!(heap.len(), 50);
        assert_eq!(heap.peek_root(), Ok(&0));
        assert!(heap.is_consistent());
    }

    #[test]
    fn test_remove_last_and_middle() {
        let mut heap = IndexableBinaryHeap::new_min();
        let handles: Vec<_> = [1, 4, 2, 8, 5, 3].iter().map(|&v| heap.insert(v)).collect();

        // The last inserted item sits in the last slot
        assert_eq!(heap.remove_item(handles[5]), Ok(3));
        assert!(heap.is_consistent());

        assert_eq!(heap.remove_item(handles[1]), Ok(4));
        assert!(heap.is_consistent());
        assert!(!heap.contains(handles[1]));
        assert_eq!(heap.remove_item(handles[1]), Err(HeapError::NotFound(handles[1])));

        assert_eq!(heap.into_sorted_vec(), vec![1, 2, 5, 8]);
    }

    #[test]
    fn test_update_priority_both_directions() {
        let mut heap = IndexableBinaryHeap::new_min();
        let handles: Vec<_> = (0..10).map(|v| heap.insert(v * 10)).collect();

        heap.update_priority(handles[9], |v| *v = -1).unwrap();
        assert_eq!(heap.peek_root_entry(), Ok((handles[9], &-1)));
        assert!(heap.is_consistent());

        heap.update_priority(handles[9], |v| *v = 1000).unwrap();
        assert_eq!(heap.peek_root(), Ok(&0));
        assert!(heap.is_consistent());

        assert_eq!(heap.set_priority(handles[0], 55), Ok(0));
        assert_eq!(heap.get(handles[0]), Some(&55));
        assert_eq!(heap.peek_root(), Ok(&10));
        assert!(heap.is_consistent());
    }

    #[test]
    fn test_duplicates_are_distinct() {
        let mut heap = IndexableBinaryHeap::new_min();
        let a = heap.insert(7);
        let b = heap.insert(7);
        assert_ne!(a, b);
        heap.remove_item(a).unwrap();
        assert!(heap.contains(b));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_restore_out_of_range() {
        let mut heap = IndexableBinaryHeap::new_min();
        heap.insert(1);
        assert!(matches!(heap.restore(3), Err(HeapError::InvalidArgument(_))));
    }

    #[test]
    fn test_insert_entry_twice() {
        let mut heap = IndexableBinaryHeap::new_max();
        let handle = Handle::from(3);
        heap.insert_entry(handle, 'a').unwrap();
        assert!(matches!(
            heap.insert_entry(handle, 'b'),
            Err(HeapError::InvalidArgument(_))
        ));
        assert_eq!(heap.to_vec(), vec!['a']);
    }

    #[test]
    fn test_insert_after_insert_entry() {
        let mut heap = IndexableBinaryHeap::new_min();
        heap.insert_entry(Handle::from(0), 5).unwrap();
        heap.insert_entry(Handle::from(4), 9).unwrap();
        let fresh = heap.insert(7);
        assert_eq!(fresh, Handle::from(5));
        assert_eq!(heap.len(), 3);
        assert!(heap.is_consistent());

        assert_eq!(heap.remove_item(Handle::from(0)), Ok(5));
        assert_eq!(heap.peek_root_entry(), Ok((fresh, &7)));
        assert!(heap.is_consistent());
    }
}
