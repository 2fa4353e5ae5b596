//! Taxonomy domain: grades, semesters, departments, question context

mod entity;
mod repository;

pub use entity::{
    ContextLabels, Department, QuestionContext, TaxonomyItem, TaxonomyKind, UNSPECIFIED_LABEL,
};
pub use repository::TaxonomyRepository;
