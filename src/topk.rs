//! Incremental top-k set built from two indexable heaps.
//!
//! The head is a min-heap holding the k largest items, the tail a max-heap
//! with everything else. Keeping `min(head) >= max(tail)` means the
//! boundary between both heaps is always the k-th largest item.

use std::collections::HashMap;

use derivative::Derivative;
use log::debug;

use crate::base::{Handle, HandleAllocator, HeapError, Result};
use crate::heap::{Direction, HeapOptions, IndexableBinaryHeap};

#[derive(Derivative, Clone, Debug)]
#[derivative(Default)]
pub struct PartitionOptions {
    /// Initial number of slots of each heap
    #[derivative(Default(value = "10"))]
    pub initial_capacity: usize,
}

/// Heap currently holding an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Head,
    Tail,
}

#[derive(Debug, Clone)]
pub struct TopKPartition<T> {
    /// Min-heap with the (at most) k largest items
    head: IndexableBinaryHeap<T>,
    /// Max-heap with the remaining items
    tail: IndexableBinaryHeap<T>,
    k: usize,
    owner: HashMap<Handle, Side>,
    handles: HandleAllocator,
}

impl<T: Ord> TopKPartition<T> {
    pub fn new(k: usize) -> Result<Self> {
        Self::with_options(k, &PartitionOptions::default())
    }

    pub fn with_options(k: usize, options: &PartitionOptions) -> Result<Self> {
        if k == 0 {
            return Err(HeapError::InvalidArgument("k must be positive".to_string()));
        }

        let head_options = HeapOptions {
            initial_capacity: options.initial_capacity.min(k),
            direction: Direction::Min,
        };
        let tail_options = HeapOptions {
            initial_capacity: options.initial_capacity,
            direction: Direction::Max,
        };

        Ok(Self {
            head: IndexableBinaryHeap::with_options(&head_options),
            tail: IndexableBinaryHeap::with_options(&tail_options),
            k,
            owner: HashMap::with_capacity(options.initial_capacity),
            handles: HandleAllocator::default(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of tracked items
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty()
    }

    /// Tracks a new item
    pub fn insert(&mut self, item: T) -> Result<Handle> {
        let handle = self.handles.allocate();

        if self.head.len() < self.k {
            self.head.insert_entry(handle, item)?;
            self.owner.insert(handle, Side::Head);
            return Ok(handle);
        }

        if &item > self.head.peek_root()? {
            let (evicted, value) = self.head.extract_root_entry()?;
            debug!("{} enters the top-k, {} moves to the tail", handle, evicted);
            self.tail.insert_entry(evicted, value)?;
            self.owner.insert(evicted, Side::Tail);

            self.head.insert_entry(handle, item)?;
            self.owner.insert(handle, Side::Head);
        } else {
            self.tail.insert_entry(handle, item)?;
            self.owner.insert(handle, Side::Tail);
        }
        Ok(handle)
    }

    /// Unordered copy of the min(k, len) largest items
    pub fn top_k_items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.head.to_vec()
    }

    /// Handles and items of the top-k set, in no particular order
    pub fn iter_top_k(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.head.iter()
    }

    /// Consumes the partition and returns the top-k set, largest first
    pub fn into_sorted_top_k(self) -> Vec<T> {
        let mut items = self.head.into_sorted_vec();
        items.reverse();
        items
    }

    /// Returns false for items that are not tracked
    pub fn is_in_top_k(&self, handle: Handle) -> bool {
        self.owner.get(&handle) == Some(&Side::Head)
    }

    /// The k-th largest item, i.e. the value a new item has to exceed to
    /// enter the top-k set (None while fewer than k items are tracked)
    pub fn kth_largest(&self) -> Option<&T> {
        if self.head.len() < self.k {
            return None;
        }
        self.head.peek_root().ok()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.owner.get(&handle)? {
            Side::Head => self.head.get(handle),
            Side::Tail => self.tail.get(handle),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.owner.contains_key(&handle)
    }

    fn heap_mut(&mut self, side: Side) -> &mut IndexableBinaryHeap<T> {
        match side {
            Side::Head => &mut self.head,
            Side::Tail => &mut self.tail,
        }
    }

    fn side_of(&self, handle: Handle) -> Result<Side> {
        self.owner
            .get(&handle)
            .copied()
            .ok_or(HeapError::NotFound(handle))
    }

    /// Lets `change` modify a tracked item, then re-establishes the
    /// partition
    pub fn update_priority<F>(&mut self, handle: Handle, change: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let side = self.side_of(handle)?;
        self.heap_mut(side).update_priority(handle, change)?;
        self.rebalance()
    }

    /// Replaces a tracked item and returns the previous one
    pub fn set_priority(&mut self, handle: Handle, item: T) -> Result<T> {
        let side = self.side_of(handle)?;
        let previous = self.heap_mut(side).set_priority(handle, item)?;
        self.rebalance()?;
        Ok(previous)
    }

    /// One priority change breaks the boundary by at most one pair, so a
    /// single exchange of both roots is enough
    fn rebalance(&mut self) -> Result<()> {
        let crossed = match (self.head.peek_root(), self.tail.peek_root()) {
            (Ok(head_min), Ok(tail_max)) => tail_max > head_min,
            _ => false,
        };
        if !crossed {
            return Ok(());
        }

        let (promoted, promoted_item) = self.tail.extract_root_entry()?;
        let (demoted, demoted_item) = self.head.extract_root_entry()?;
        debug!("Swapping {} (tail) and {} (head)", promoted, demoted);

        self.head.insert_entry(promoted, promoted_item)?;
        self.owner.insert(promoted, Side::Head);
        self.tail.insert_entry(demoted, demoted_item)?;
        self.owner.insert(demoted, Side::Tail);
        Ok(())
    }

    /// Stops tracking an item and returns it
    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        let item = match self.side_of(handle)? {
            Side::Head => {
                let item = self.head.remove_item(handle)?;
                if !self.tail.is_empty() {
                    let (promoted, value) = self.tail.extract_root_entry()?;
                    debug!("{} left the top-k, promoting {}", handle, promoted);
                    self.head.insert_entry(promoted, value)?;
                    self.owner.insert(promoted, Side::Head);
                }
                item
            }
            // A non-empty tail implies a full head, which stays full
            Side::Tail => self.tail.remove_item(handle)?,
        };
        self.owner.remove(&handle);
        Ok(item)
    }

    pub fn clear(&mut self) {
        self.head.clear();
        self.tail.clear();
        self.owner.clear();
    }

    /// Checks both heaps, the boundary and the cardinality of the head
    pub fn is_consistent(&self) -> bool {
        let boundary = match (self.head.peek_root(), self.tail.peek_root()) {
            (Ok(head_min), Ok(tail_max)) => head_min >= tail_max,
            _ => true,
        };
        let owners = self.owner.len() == self.len()
            && self.head.iter().all(|(h, _)| self.owner.get(&h) == Some(&Side::Head))
            && self.tail.iter().all(|(h, _)| self.owner.get(&h) == Some(&Side::Tail));

        boundary
            && owners
            && self.head.len() == self.k.min(self.len())
            && self.head.is_consistent()
            && self.tail.is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn top_set(partition: &TopKPartition<i32>) -> HashSet<i32> {
        partition.top_k_items().into_iter().collect()
    }

    #[test]
    fn test_zero_k() {
        assert!(matches!(
            TopKPartition::<i32>::new(0),
            Err(HeapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_top_three() {
        let mut partition = TopKPartition::new(3).unwrap();
        let handles: HashMap<i32, Handle> = [5, 1, 9, 2, 8, 3]
            .iter()
            .map(|&v| (v, partition.insert(v).unwrap()))
            .collect();

        assert_eq!(top_set(&partition), HashSet::from([9, 8, 5]));
        assert!(partition.is_in_top_k(handles[&5]));
        assert!(!partition.is_in_top_k(handles[&1]));
        assert!(!partition.is_in_top_k(Handle::from(1000)));
        assert_eq!(partition.kth_largest(), Some(&5));
        assert_eq!(partition.len(), 6);
        assert!(partition.is_consistent());
    }

    #[test]
    fn test_update_crosses_boundary() {
        let mut partition = TopKPartition::new(2).unwrap();
        let four = partition.insert(4).unwrap();
        partition.insert(7).unwrap();

        partition.update_priority(four, |v| *v = 9).unwrap();
        assert_eq!(top_set(&partition), HashSet::from([9, 7]));

        let low = partition.insert(1).unwrap();
        assert!(!partition.is_in_top_k(low));
        assert_eq!(partition.set_priority(low, 8), Ok(1));
        assert!(partition.is_in_top_k(low));
        assert_eq!(top_set(&partition), HashSet::from([9, 8]));
        assert_eq!(partition.set_priority(four, 0), Ok(9));
        assert_eq!(top_set(&partition), HashSet::from([8, 7]));
        assert!(partition.is_consistent());
    }

    #[test]
    fn test_remove_promotes() {
        let mut partition = TopKPartition::new(2).unwrap();
        let handles: Vec<_> = [10, 20, 30, 5]
            .iter()
            .map(|&v| partition.insert(v).unwrap())
            .collect();

        assert_eq!(partition.remove(handles[2]), Ok(30));
        assert_eq!(top_set(&partition), HashSet::from([20, 10]));
        assert!(partition.is_in_top_k(handles[0]));

        assert_eq!(partition.remove(handles[3]), Ok(5));
        assert_eq!(partition.remove(handles[1]), Ok(20));
        assert_eq!(top_set(&partition), HashSet::from([10]));
        assert_eq!(partition.kth_largest(), None);
        assert!(partition.is_consistent());

        assert_eq!(
            partition.remove(handles[1]),
            Err(HeapError::NotFound(handles[1]))
        );
        assert_eq!(
            partition.update_priority(handles[1], |_| {}),
            Err(HeapError::NotFound(handles[1]))
        );
    }

    #[test]
    fn test_sorted_top_k() {
        let mut partition = TopKPartition::new(3).unwrap();
        for v in [3, 3, 1, 4, 1, 5] {
            partition.insert(v).unwrap();
        }
        assert_eq!(partition.into_sorted_top_k(), vec![5, 4, 3]);
    }
}
