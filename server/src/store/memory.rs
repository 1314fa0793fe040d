//! In-process store used by tests and by database-less development runs.
//!
//! Not durable and not shared between processes. Each mutation takes the
//! write lock for its whole check-and-write, which gives the same atomicity the
//! Postgres constraints give the durable backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    building_not_found, event_not_found, missing_building, organizer_not_found, BuildingStore,
    EventStore, OrganizerStore, StoreError, StoreResult,
};
use crate::models::{
    Building, BuildingChanges, Event, EventFilter, NewBuilding, NewEvent, NewOrganizer, Organizer,
    OrganizerStatus,
};

#[derive(Debug, Default)]
struct Tables {
    organizers: BTreeMap<i64, Organizer>,
    buildings: BTreeMap<i64, Building>,
    events: BTreeMap<i64, Event>,
    last_organizer_id: i64,
    last_building_id: i64,
    last_event_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizerStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Organizer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizers
            .values()
            .find(|o| o.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Organizer>> {
        Ok(self.tables.read().await.organizers.get(&id).cloned())
    }

    async fn insert(&self, record: NewOrganizer) -> StoreResult<Organizer> {
        let mut tables = self.tables.write().await;
        if tables.organizers.values().any(|o| o.email == record.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        tables.last_organizer_id += 1;
        let now = Utc::now();
        let organizer = Organizer {
            id: tables.last_organizer_id,
            name: record.name,
            fname: record.fname,
            lname: record.lname,
            email: record.email,
            contact_no: record.contact_no,
            password_hash: record.password_hash,
            status: OrganizerStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.organizers.insert(organizer.id, organizer.clone());
        Ok(organizer)
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrganizerStatus,
        to: OrganizerStatus,
    ) -> StoreResult<Organizer> {
        let mut tables = self.tables.write().await;
        let organizer = tables
            .organizers
            .get_mut(&id)
            .ok_or_else(|| organizer_not_found(id))?;
        if organizer.status != from {
            return Err(StoreError::Conflict(format!(
                "Organizer {} is {}, expected {}",
                id, organizer.status, from
            )));
        }

        organizer.status = to;
        organizer.updated_at = Utc::now();
        Ok(organizer.clone())
    }

    async fn list(&self) -> StoreResult<Vec<Organizer>> {
        Ok(self.tables.read().await.organizers.values().cloned().collect())
    }
}

#[async_trait]
impl BuildingStore for MemoryStore {
    async fn list_buildings(&self) -> StoreResult<Vec<Building>> {
        Ok(self.tables.read().await.buildings.values().cloned().collect())
    }

    async fn get_building(&self, id: i64) -> StoreResult<Building> {
        self.tables
            .read()
            .await
            .buildings
            .get(&id)
            .cloned()
            .ok_or_else(|| building_not_found(id))
    }

    async fn create_building(&self, building: NewBuilding) -> StoreResult<Building> {
        let mut tables = self.tables.write().await;
        tables.last_building_id += 1;
        let now = Utc::now();
        let building = Building {
            id: tables.last_building_id,
            name: building.name,
            address: building.address,
            capacity: building.capacity,
            created_at: now,
            updated_at: now,
        };
        tables.buildings.insert(building.id, building.clone());
        Ok(building)
    }

    async fn update_building(&self, id: i64, changes: BuildingChanges) -> StoreResult<Building> {
        let mut tables = self.tables.write().await;
        let building = tables
            .buildings
            .get_mut(&id)
            .ok_or_else(|| building_not_found(id))?;
        changes.apply(building);
        building.updated_at = Utc::now();
        Ok(building.clone())
    }

    async fn delete_building(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .buildings
            .remove(&id)
            .ok_or_else(|| building_not_found(id))?;
        for event in tables.events.values_mut() {
            if event.building_id == Some(id) {
                event.building_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn get_event(&self, id: i64) -> StoreResult<Event> {
        self.tables
            .read()
            .await
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| event_not_found(id))
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if let Some(building_id) = event.building_id {
            if !tables.buildings.contains_key(&building_id) {
                return Err(missing_building(building_id));
            }
        }

        tables.last_event_id += 1;
        let now = Utc::now();
        let event = Event {
            id: tables.last_event_id,
            organizer_id: event.organizer_id,
            building_id: event.building_id,
            title: event.title,
            description: event.description,
            start_time: event.start_time,
            end_time: event.end_time,
            created_at: now,
            updated_at: now,
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if let Some(building_id) = event.building_id {
            if !tables.buildings.contains_key(&building_id) {
                return Err(missing_building(building_id));
            }
        }

        let stored = tables
            .events
            .get_mut(&event.id)
            .ok_or_else(|| event_not_found(event.id))?;
        stored.building_id = event.building_id;
        stored.title = event.title;
        stored.description = event.description;
        stored.start_time = event.start_time;
        stored.end_time = event.end_time;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_event(&self, id: i64) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| event_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_organizer(email: &str) -> NewOrganizer {
        NewOrganizer {
            name: "John Doe".to_string(),
            fname: "John".to_string(),
            lname: "Doe".to_string(),
            email: email.to_string(),
            contact_no: None,
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_pending_status() {
        let store = MemoryStore::new();
        let first = store.insert(new_organizer("a@mail.com")).await.unwrap();
        let second = store.insert(new_organizer("b@mail.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, OrganizerStatus::Pending);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert(new_organizer("a@mail.com")).await.unwrap();

        let err = store.insert(new_organizer("a@mail.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_is_conditional() {
        let store = MemoryStore::new();
        let organizer = store.insert(new_organizer("a@mail.com")).await.unwrap();

        let approved = store
            .update_status(organizer.id, OrganizerStatus::Pending, OrganizerStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, OrganizerStatus::Approved);

        let err = store
            .update_status(organizer.id, OrganizerStatus::Pending, OrganizerStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .update_status(99, OrganizerStatus::Pending, OrganizerStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_event_requires_existing_building() {
        let store = MemoryStore::new();
        let err = store
            .create_event(NewEvent {
                organizer_id: 1,
                building_id: Some(42),
                title: "Launch".to_string(),
                description: None,
                start_time: Utc::now(),
                end_time: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_deleting_building_detaches_events() {
        let store = MemoryStore::new();
        let building = store
            .create_building(NewBuilding {
                name: "Main Hall".to_string(),
                address: None,
                capacity: None,
            })
            .await
            .unwrap();
        let event = store
            .create_event(NewEvent {
                organizer_id: 1,
                building_id: Some(building.id),
                title: "Launch".to_string(),
                description: None,
                start_time: Utc::now(),
                end_time: None,
            })
            .await
            .unwrap();

        store.delete_building(building.id).await.unwrap();

        let event = store.get_event(event.id).await.unwrap();
        assert_eq!(event.building_id, None);
        assert!(matches!(
            store.get_building(building.id).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
