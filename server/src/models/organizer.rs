use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an organizer account. `Approved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizerStatus {
    Pending,
    Approved,
}

impl OrganizerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizerStatus::Pending => "pending",
            OrganizerStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for OrganizerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrganizerStatus::Pending),
            "approved" => Ok(OrganizerStatus::Approved),
            other => Err(format!("unknown organizer status '{}'", other)),
        }
    }
}

/// Stored organizer record. Carries the password hash, so it is never
/// serialized; responses go through [`OrganizerResponse`].
#[derive(Debug, Clone)]
pub struct Organizer {
    pub id: i64,
    pub name: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub contact_no: Option<String>,
    pub password_hash: String,
    pub status: OrganizerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organizer {
    pub fn summary(&self) -> OrganizerSummary {
        OrganizerSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Record handed to the store on registration; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewOrganizer {
    pub name: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub contact_no: Option<String>,
    pub password_hash: String,
}

/// What the notifier needs to know about an organizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerResponse {
    pub id: i64,
    pub name: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub username: String,
    pub contact_no: Option<String>,
    pub status: OrganizerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Organizer> for OrganizerResponse {
    fn from(organizer: Organizer) -> Self {
        Self {
            id: organizer.id,
            name: organizer.name,
            fname: organizer.fname,
            lname: organizer.lname,
            username: organizer.email.clone(),
            email: organizer.email,
            contact_no: organizer.contact_no,
            status: organizer.status,
            created_at: organizer.created_at,
            updated_at: organizer.updated_at,
        }
    }
}

/// Registration body. Every field is optional at the wire level so missing
/// fields surface as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub contact_no: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub organizer_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Organizer {
        let now = Utc::now();
        Organizer {
            id: 7,
            name: "John Doe".to_string(),
            fname: "John".to_string(),
            lname: "Doe".to_string(),
            email: "john@mail.com".to_string(),
            contact_no: None,
            password_hash: "$argon2id$secret".to_string(),
            status: OrganizerStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_response_never_contains_password_hash() {
        let json = serde_json::to_string(&OrganizerResponse::from(sample())).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"username\":\"john@mail.com\""));
        assert!(json.contains("\"status\":\"pending\""));
    }

    #[test]
    fn test_status_parses_from_storage_text() {
        assert_eq!("approved".parse::<OrganizerStatus>(), Ok(OrganizerStatus::Approved));
        assert_eq!("pending".parse::<OrganizerStatus>(), Ok(OrganizerStatus::Pending));
        assert!("rejected".parse::<OrganizerStatus>().is_err());
    }
}
