//! SQLite taxonomy repository

mod repository;

pub use repository::SqliteTaxonomyRepository;
