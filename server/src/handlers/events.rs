use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use crate::auth::AuthenticatedOrganizer;
use crate::models::{CreateEventRequest, Event, EventFilter, UpdateEventRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn list_events(
    State(state): State<AppState>,
    filter: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(filter) = filter?;
    let events = state.events.list_events(filter).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state.events.get_event(event_id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    organizer: AuthenticatedOrganizer,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let event = state
        .events
        .create_event(request.validate(organizer.id)?)
        .await?;
    tracing::info!(event_id = event.id, organizer_id = organizer.id, "Event created");
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    organizer: AuthenticatedOrganizer,
    Path(event_id): Path<i64>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let changes = request.validate()?;

    let current = owned_event(&state, &organizer, event_id).await?;
    let event = state.events.update_event(changes.merged(&current)?).await?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    organizer: AuthenticatedOrganizer,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    owned_event(&state, &organizer, event_id).await?;
    state.events.delete_event(event_id).await?;
    tracing::info!(event_id, organizer_id = organizer.id, "Event deleted");
    Ok(empty_success("Event deleted"))
}

async fn owned_event(
    state: &AppState,
    organizer: &AuthenticatedOrganizer,
    event_id: i64,
) -> Result<Event, AppError> {
    let event = state.events.get_event(event_id).await?;
    if event.organizer_id != organizer.id {
        return Err(AppError::Forbidden(
            "Only the event's organizer may change it".to_string(),
        ));
    }
    Ok(event)
}
