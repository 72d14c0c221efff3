//! Indexable binary heaps and an incremental top-k partition built on them.

pub mod base;
pub mod heap;
pub mod topk;

#[cfg(feature = "python")]
mod py;

pub use base::{Handle, HeapError, Result};
pub use heap::{Direction, HeapOptions, IndexableBinaryHeap};
pub use topk::{PartitionOptions, TopKPartition};
