//! Entity Store implementations for the Label Pizza sync engine.
//!
//! The [`EntityStore`] trait is the sync engine's only window onto
//! persisted state: natural-key lookups plus single-record inserts and
//! updates per entity type. Two implementations live here:
//!
//! - [`memory::MemoryStore`] — in-process tables, used by tests and dry
//!   runs.
//! - [`postgres::PgStore`] — sqlx/Postgres, one repository module per
//!   table family.
//!
//! Business rules (referential checks, immutability, admin locks) do not
//! live here; the store is plain CRUD and the sync adapters layer the rules
//! on top.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{AnnotationRow, EntityStore, GroundTruthRow, QuestionGroupRow};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}
