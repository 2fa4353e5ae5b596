//! Commands module - all operations as library functions
//!
//! These are what the CLI calls. Each takes an open [`Database`](crate::storage::Database).

pub mod ask;
pub mod audit;
pub mod curriculum;
pub mod knowledge;
pub mod taxonomy;
