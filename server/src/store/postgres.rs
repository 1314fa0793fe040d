//! Postgres-backed store.
//!
//! Invariants live in the schema (`migrations/`): a unique index on
//! `organizers.email`, a check constraint on `organizers.status`, and a
//! foreign key from `events.building_id` with `ON DELETE SET NULL`. Violations
//! are mapped by SQLSTATE so a losing concurrent writer sees a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::{
    building_not_found, event_not_found, missing_building, organizer_not_found, BuildingStore,
    EventStore, OrganizerStore, StoreError, StoreResult,
};
use crate::models::{
    Building, BuildingChanges, Event, EventFilter, NewBuilding, NewEvent, NewOrganizer, Organizer,
    OrganizerStatus,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const ORGANIZER_COLUMNS: &str = "id, name, fname, lname, email, contact_no, password_hash, \
     status, created_at, updated_at";
const BUILDING_COLUMNS: &str = "id, name, address, capacity, created_at, updated_at";
const EVENT_COLUMNS: &str = "id, organizer_id, building_id, title, description, start_time, \
     end_time, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrganizerStore for PostgresStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Organizer>> {
        let row = sqlx::query_as::<_, OrganizerRow>(&format!(
            "SELECT {ORGANIZER_COLUMNS} FROM organizers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrganizerRow::into_organizer).transpose()
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Organizer>> {
        let row = sqlx::query_as::<_, OrganizerRow>(&format!(
            "SELECT {ORGANIZER_COLUMNS} FROM organizers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrganizerRow::into_organizer).transpose()
    }

    async fn insert(&self, record: NewOrganizer) -> StoreResult<Organizer> {
        let inserted = sqlx::query_as::<_, OrganizerRow>(&format!(
            "INSERT INTO organizers (name, fname, lname, email, contact_no, password_hash, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {ORGANIZER_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.fname)
        .bind(&record.lname)
        .bind(&record.email)
        .bind(&record.contact_no)
        .bind(&record.password_hash)
        .bind(OrganizerStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => row.into_organizer(),
            Err(err) if has_code(&err, UNIQUE_VIOLATION) => {
                Err(StoreError::Conflict("Email already registered".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrganizerStatus,
        to: OrganizerStatus,
    ) -> StoreResult<Organizer> {
        // Check and write in one statement; a racing approver updates zero rows.
        let updated = sqlx::query_as::<_, OrganizerRow>(&format!(
            "UPDATE organizers SET status = $1, updated_at = NOW()
             WHERE id = $2 AND status = $3
             RETURNING {ORGANIZER_COLUMNS}"
        ))
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return row.into_organizer();
        }

        match self.find_by_id(id).await? {
            Some(current) => Err(StoreError::Conflict(format!(
                "Organizer {} is {}, expected {}",
                id, current.status, from
            ))),
            None => Err(organizer_not_found(id)),
        }
    }

    async fn list(&self) -> StoreResult<Vec<Organizer>> {
        let rows = sqlx::query_as::<_, OrganizerRow>(&format!(
            "SELECT {ORGANIZER_COLUMNS} FROM organizers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrganizerRow::into_organizer).collect()
    }
}

#[async_trait]
impl BuildingStore for PostgresStore {
    async fn list_buildings(&self) -> StoreResult<Vec<Building>> {
        let buildings = sqlx::query_as::<_, Building>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(buildings)
    }

    async fn get_building(&self, id: i64) -> StoreResult<Building> {
        sqlx::query_as::<_, Building>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| building_not_found(id))
    }

    async fn create_building(&self, building: NewBuilding) -> StoreResult<Building> {
        let building = sqlx::query_as::<_, Building>(&format!(
            "INSERT INTO buildings (name, address, capacity) VALUES ($1, $2, $3)
             RETURNING {BUILDING_COLUMNS}"
        ))
        .bind(&building.name)
        .bind(&building.address)
        .bind(building.capacity)
        .fetch_one(&self.pool)
        .await?;
        Ok(building)
    }

    async fn update_building(&self, id: i64, changes: BuildingChanges) -> StoreResult<Building> {
        sqlx::query_as::<_, Building>(&format!(
            "UPDATE buildings SET
                name = COALESCE($1, name),
                address = COALESCE($2, address),
                capacity = COALESCE($3, capacity),
                updated_at = NOW()
             WHERE id = $4
             RETURNING {BUILDING_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(&changes.address)
        .bind(changes.capacity)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| building_not_found(id))
    }

    async fn delete_building(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM buildings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(building_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE ($1::BIGINT IS NULL OR building_id = $1)
               AND ($2::BIGINT IS NULL OR organizer_id = $2)
             ORDER BY start_time, id"
        ))
        .bind(filter.building_id)
        .bind(filter.organizer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_event(&self, id: i64) -> StoreResult<Event> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| event_not_found(id))
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let created = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (organizer_id, building_id, title, description, start_time, end_time)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.organizer_id)
        .bind(event.building_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .fetch_one(&self.pool)
        .await;

        match created {
            Ok(event) => Ok(event),
            Err(err) if has_code(&err, FOREIGN_KEY_VIOLATION) => {
                Err(missing_building(event.building_id.unwrap_or_default()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET
                building_id = $1,
                title = $2,
                description = $3,
                start_time = $4,
                end_time = $5,
                updated_at = NOW()
             WHERE id = $6
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.building_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.id)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(event_not_found(event.id)),
            Err(err) if has_code(&err, FOREIGN_KEY_VIOLATION) => {
                Err(missing_building(event.building_id.unwrap_or_default()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_event(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }
        Ok(())
    }
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|c| c == code).unwrap_or(false);
    }
    false
}

/// Internal row type for SQLx mapping.
#[derive(FromRow)]
struct OrganizerRow {
    id: i64,
    name: String,
    fname: String,
    lname: String,
    email: String,
    contact_no: Option<String>,
    password_hash: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizerRow {
    fn into_organizer(self) -> StoreResult<Organizer> {
        let status = self
            .status
            .parse::<OrganizerStatus>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Organizer {
            id: self.id,
            name: self.name,
            fname: self.fname,
            lname: self.lname,
            email: self.email,
            contact_no: self.contact_no,
            password_hash: self.password_hash,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
