use std::fmt;

use thiserror::Error;

/// Opaque token identifying a tracked item.
///
/// Handles are handed out on insertion and keep designating the same item
/// whatever its priority becomes, so two items with equal values are never
/// confused with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(id: u64) -> Self {
        Handle(id)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic handle source
#[derive(Debug, Default, Clone)]
pub(crate) struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next);
        self.next += 1;
        handle
    }

    /// Makes sure `handle` is never allocated later on
    pub fn reserve(&mut self, handle: Handle) {
        self.next = self.next.max(handle.0 + 1);
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("the structure is empty")]
    EmptyStructure,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("item {0} is not tracked")]
    NotFound(Handle),
}

pub type Result<T> = std::result::Result<T, HeapError>;
