pub mod model;
pub mod operations;
