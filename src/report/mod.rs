//! Derived views over the task collection. Nothing here mutates the store.

pub mod aggregate;
pub mod period;
