//! Per-entity-type [`crate::adapter::EntityAdapter`] implementations.
//!
//! Each adapter owns the rules that make its entity type different: lookup
//! shape, referential checks, immutability constraints, and how a planned
//! action maps onto store calls. Everything shared lives in the engine.

use labelpizza_core::{EntityKey, EntityType};
use labelpizza_db::StoreError;

use crate::error::SyncError;

mod annotation;
mod assignment;
mod ground_truth;
mod project;
mod project_group;
mod question_group;
mod schema;
mod user;
mod video;

pub use annotation::AnnotationAdapter;
pub use assignment::AssignmentAdapter;
pub use ground_truth::GroundTruthAdapter;
pub use project::ProjectAdapter;
pub use project_group::ProjectGroupAdapter;
pub use question_group::QuestionGroupAdapter;
pub use schema::SchemaAdapter;
pub use user::UserAdapter;
pub use video::VideoAdapter;

/// Wrap a store write failure with the entity and key it hit.
pub(crate) fn mutation_err(
    entity: EntityType,
    key: EntityKey,
) -> impl FnOnce(StoreError) -> SyncError {
    move |source| SyncError::Mutation {
        entity,
        key,
        source,
    }
}

/// A verification failure, rendered for the aggregated report.
pub(crate) fn verification_failure(message: String) -> SyncError {
    SyncError::Validation(labelpizza_core::CoreError::Validation(message))
}
