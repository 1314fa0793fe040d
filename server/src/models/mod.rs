pub mod building;
pub mod event;
pub mod organizer;

pub use building::{Building, BuildingChanges, CreateBuildingRequest, NewBuilding, UpdateBuildingRequest};
pub use event::{CreateEventRequest, Event, EventChanges, EventFilter, NewEvent, UpdateEventRequest};
pub use organizer::{
    LoginRequest, LoginResponse, NewOrganizer, Organizer, OrganizerResponse, OrganizerStatus,
    OrganizerSummary, RegisterRequest,
};

/// Trim a client string, treating blank input the same as an absent field.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
