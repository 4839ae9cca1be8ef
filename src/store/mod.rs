//! Data access for locations and categories.
//!
//! The engine only sees [`LocationStore`]; production wires in
//! [`postgres::PgLocationStore`], tests use [`memory::MemoryLocationStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::query::{NearbyQuery, PageRequest, Predicate};
use crate::types::{Category, Location, LocationPatch, NearbyLocation, NewLocation};

pub use memory::MemoryLocationStore;
pub use postgres::PgLocationStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The referenced category does not exist.
    #[error("category {0} does not exist")]
    UnknownCategory(i64),

    /// The creator has no row in `users`.
    #[error("user {0} is not registered")]
    UnknownUser(i64),

    /// Any other constraint rejected the write; carries the constraint name.
    #[error("constraint {0} violated")]
    Constraint(String),
}

impl StoreError {
    /// Caller-side data problems, as opposed to store failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::UnknownCategory(_) | StoreError::UnknownUser(_))
    }
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Returns one page of matches (newest first) and the total match count.
    async fn search(&self, predicate: &Predicate, page: PageRequest) -> Result<(Vec<Location>, i64), StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Location>, StoreError>;

    /// Locations within `query.radius_km`, nearest first, at most `query.limit`.
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<NearbyLocation>, StoreError>;

    async fn create(&self, new: NewLocation) -> Result<Location, StoreError>;

    /// Applies `patch`; `None` if the id does not exist.
    async fn update(&self, id: i64, patch: LocationPatch) -> Result<Option<Location>, StoreError>;

    /// Hard delete; `false` if nothing was removed.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError>;

    async fn categories(&self) -> Result<Vec<Category>, StoreError>;
}
