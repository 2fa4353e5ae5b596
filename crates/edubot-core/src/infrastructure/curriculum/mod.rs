//! SQLite curriculum document store

mod repository;

pub use repository::SqliteCurriculumStore;
