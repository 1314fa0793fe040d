//! Persistence boundary.
//!
//! The store is the only arbiter of the organizer invariants under
//! concurrency: email uniqueness is a unique index, and status transitions are
//! conditional updates that fail with [`StoreError::Conflict`] when the row is
//! no longer in the expected state. Callers never hold locks across calls.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Building, BuildingChanges, Event, EventFilter, NewBuilding, NewEvent,
    NewOrganizer, Organizer, OrganizerStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrganizerStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Organizer>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Organizer>>;
    /// Fails with `Conflict` when the email is already taken.
    async fn insert(&self, record: NewOrganizer) -> StoreResult<Organizer>;
    /// Fails with `NotFound` for an unknown id and `Conflict` when the current
    /// status differs from `from`.
    async fn update_status(
        &self,
        id: i64,
        from: OrganizerStatus,
        to: OrganizerStatus,
    ) -> StoreResult<Organizer>;
    async fn list(&self) -> StoreResult<Vec<Organizer>>;
}

#[async_trait]
pub trait BuildingStore: Send + Sync {
    async fn list_buildings(&self) -> StoreResult<Vec<Building>>;
    async fn get_building(&self, id: i64) -> StoreResult<Building>;
    async fn create_building(&self, building: NewBuilding) -> StoreResult<Building>;
    async fn update_building(&self, id: i64, changes: BuildingChanges) -> StoreResult<Building>;
    /// Events held in the building keep existing with their building cleared.
    async fn delete_building(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>>;
    async fn get_event(&self, id: i64) -> StoreResult<Event>;
    /// Fails with `MissingReference` when the building does not exist.
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
    /// Persist the mutable columns of an already-validated event.
    async fn update_event(&self, event: Event) -> StoreResult<Event>;
    async fn delete_event(&self, id: i64) -> StoreResult<()>;
}

pub(crate) fn organizer_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Organizer {} not found", id))
}

pub(crate) fn building_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Building {} not found", id))
}

pub(crate) fn event_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Event {} not found", id))
}

pub(crate) fn missing_building(id: i64) -> StoreError {
    StoreError::MissingReference(format!("Building {} does not exist", id))
}
