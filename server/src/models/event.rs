use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::non_blank;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub organizer_id: i64,
    pub building_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub organizer_id: i64,
    pub building_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub building_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl EventChanges {
    /// Apply onto a copy of `event` and check the resulting schedule is coherent.
    pub fn merged(&self, event: &Event) -> Result<Event, AppError> {
        let mut updated = event.clone();
        if let Some(building_id) = self.building_id {
            updated.building_id = Some(building_id);
        }
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(description) = &self.description {
            updated.description = Some(description.clone());
        }
        if let Some(start_time) = self.start_time {
            updated.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            updated.end_time = Some(end_time);
        }
        validate_schedule(updated.start_time, updated.end_time)?;
        Ok(updated)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub building_id: Option<i64>,
    pub organizer_id: Option<i64>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        self.building_id
            .map_or(true, |id| event.building_id == Some(id))
            && self.organizer_id.map_or(true, |id| event.organizer_id == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub building_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl CreateEventRequest {
    /// Validate the body; the organizer comes from the caller's token, never the body.
    pub fn validate(self, organizer_id: i64) -> Result<NewEvent, AppError> {
        let title = non_blank(self.title);
        let (title, start_time) = match (title, self.start_time) {
            (Some(title), Some(start_time)) => (title, start_time),
            _ => {
                return Err(AppError::ValidationError(
                    "Event title and start_time are required".to_string(),
                ))
            }
        };
        validate_schedule(start_time, self.end_time)?;

        Ok(NewEvent {
            organizer_id,
            building_id: self.building_id,
            title,
            description: non_blank(self.description),
            start_time,
            end_time: self.end_time,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub building_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl UpdateEventRequest {
    pub fn validate(self) -> Result<EventChanges, AppError> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(AppError::ValidationError(
                "Event title cannot be empty".to_string(),
            ));
        }

        Ok(EventChanges {
            building_id: self.building_id,
            title: non_blank(self.title),
            description: non_blank(self.description),
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

fn validate_schedule(
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match end_time {
        Some(end) if end < start_time => Err(AppError::ValidationError(
            "Event end_time must not precede start_time".to_string(),
        )),
        _ => Ok(()),
    }
}
