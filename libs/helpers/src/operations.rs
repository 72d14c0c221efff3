use log::debug;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, LogNormal};

use indexed_topk::{Result, TopKPartition};

use crate::model::ReferenceModel;

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Insert(i64),
    /// Remove the n-th tracked handle (modulo the number of items)
    Remove(usize),
    /// Change the value of the n-th tracked handle
    Update(usize, i64),
}

/// Draws values from a log-normal distribution so that small values
/// (and thus ties) are frequent
pub fn random_value(rng: &mut dyn RngCore) -> i64 {
    let dist = LogNormal::<f64>::new(2., 1.).unwrap();
    dist.sample(rng).round() as i64
}

pub fn random_operations(count: usize, rng: &mut dyn RngCore) -> Vec<Operation> {
    (0..count)
        .map(|_| match rng.gen_range(0..10) {
            0..=4 => Operation::Insert(random_value(rng)),
            5..=6 => Operation::Remove(rng.gen_range(0..usize::MAX)),
            _ => Operation::Update(rng.gen_range(0..usize::MAX), random_value(rng)),
        })
        .collect()
}

/// Applies an operation to both the partition and the model
pub fn apply(
    operation: Operation,
    partition: &mut TopKPartition<i64>,
    model: &mut ReferenceModel,
) -> Result<()> {
    debug!("Applying {:?}", operation);
    match operation {
        Operation::Insert(value) => {
            let handle = partition.insert(value)?;
            model.values.insert(handle, value);
        }
        Operation::Remove(n) => {
            let handles = model.handles();
            if !handles.is_empty() {
                let handle = handles[n % handles.len()];
                let removed = partition.remove(handle)?;
                assert_eq!(model.values.remove(&handle), Some(removed));
            }
        }
        Operation::Update(n, value) => {
            let handles = model.handles();
            if !handles.is_empty() {
                let handle = handles[n % handles.len()];
                partition.update_priority(handle, |v| *v = value)?;
                model.values.insert(handle, value);
            }
        }
    }
    Ok(())
}
