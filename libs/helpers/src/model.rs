use std::collections::HashMap;

use indexed_topk::{Handle, TopKPartition};

/// Naive reference: every tracked value, looked up by handle
#[derive(Default)]
pub struct ReferenceModel {
    pub values: HashMap<Handle, i64>,
}

impl ReferenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Handles in a stable order (so that seeded runs are reproducible)
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.values.keys().copied().collect();
        handles.sort();
        handles
    }

    /// The min(k, n) largest values, largest first
    pub fn top_k(&self, k: usize) -> Vec<i64> {
        let mut all: Vec<i64> = self.values.values().copied().collect();
        all.sort_by(|a, b| b.cmp(a));
        all.truncate(k);
        all
    }
}

/// Asserts that the partition holds the same top-k values as the model
pub fn check_partition(partition: &TopKPartition<i64>, model: &ReferenceModel) {
    assert!(partition.is_consistent(), "partition invariants broken");
    assert_eq!(partition.len(), model.len(), "size differ");

    let mut observed = partition.top_k_items();
    observed.sort_by(|a, b| b.cmp(a));
    let expected = model.top_k(partition.k());
    assert_eq!(observed, expected, "top-k values differ");

    for (handle, value) in model.values.iter() {
        assert_eq!(partition.get(*handle), Some(value), "value of {} differ", handle);
    }
}
