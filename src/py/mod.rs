use std::cmp::Ordering;

use log::debug;
use pyo3::exceptions::{PyIndexError, PyKeyError, PyValueError};
use pyo3::{pyclass, pymethods, pymodule, types::PyModule, PyErr, PyResult, Python};

use crate::base::{Handle, HeapError};
use crate::topk::TopKPartition;

/// Python floats, totally ordered
#[derive(Clone, Copy, Debug)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<HeapError> for PyErr {
    fn from(error: HeapError) -> Self {
        match error {
            HeapError::EmptyStructure => PyIndexError::new_err(error.to_string()),
            HeapError::InvalidArgument(_) => PyValueError::new_err(error.to_string()),
            HeapError::NotFound(_) => PyKeyError::new_err(error.to_string()),
        }
    }
}

#[pyclass(name = "TopK")]
pub struct PyTopK {
    inner: TopKPartition<Score>,
}

#[pymethods]
impl PyTopK {
    #[new]
    fn new(k: usize) -> PyResult<Self> {
        Ok(PyTopK {
            inner: TopKPartition::new(k)?,
        })
    }

    /// Tracks a score and returns its handle
    fn insert(&mut self, score: f64) -> PyResult<u64> {
        Ok(self.inner.insert(Score(score))?.id())
    }

    fn remove(&mut self, handle: u64) -> PyResult<f64> {
        Ok(self.inner.remove(Handle::from(handle))?.0)
    }

    /// Changes the score of a tracked item, returning the previous one
    fn update(&mut self, handle: u64, score: f64) -> PyResult<f64> {
        Ok(self.inner.set_priority(Handle::from(handle), Score(score))?.0)
    }

    fn is_top_k(&self, handle: u64) -> bool {
        self.inner.is_in_top_k(Handle::from(handle))
    }

    fn top_k(&self) -> Vec<f64> {
        self.inner.iter_top_k().map(|(_, score)| score.0).collect()
    }

    fn top_k_handles(&self) -> Vec<u64> {
        self.inner.iter_top_k().map(|(handle, _)| handle.id()).collect()
    }

    /// Score to beat for entering the top-k (None if not full)
    fn kth_largest(&self) -> Option<f64> {
        self.inner.kth_largest().map(|score| score.0)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __contains__(&self, handle: u64) -> bool {
        self.inner.contains(Handle::from(handle))
    }
}

/// A Python module implemented in Rust.
#[pymodule]
fn indexed_topk(_py: Python, module: &PyModule) -> PyResult<()> {
    // Init logging
    pyo3_log::init();
    debug!("Loading indexed-topk extension");

    module.add_class::<PyTopK>()?;
    Ok(())
}
