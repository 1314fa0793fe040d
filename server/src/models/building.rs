use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::non_blank;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Building {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBuilding {
    pub name: String,
    pub address: Option<String>,
    pub capacity: Option<i32>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct BuildingChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
}

impl BuildingChanges {
    pub fn apply(&self, building: &mut Building) {
        if let Some(name) = &self.name {
            building.name = name.clone();
        }
        if let Some(address) = &self.address {
            building.address = Some(address.clone());
        }
        if let Some(capacity) = self.capacity {
            building.capacity = Some(capacity);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBuildingRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
}

impl CreateBuildingRequest {
    pub fn validate(self) -> Result<NewBuilding, AppError> {
        let name = non_blank(self.name)
            .ok_or_else(|| AppError::ValidationError("Building name is required".to_string()))?;
        validate_capacity(self.capacity)?;

        Ok(NewBuilding {
            name,
            address: non_blank(self.address),
            capacity: self.capacity,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBuildingRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
}

impl UpdateBuildingRequest {
    pub fn validate(self) -> Result<BuildingChanges, AppError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::ValidationError(
                "Building name cannot be empty".to_string(),
            ));
        }
        validate_capacity(self.capacity)?;

        Ok(BuildingChanges {
            name: non_blank(self.name),
            address: non_blank(self.address),
            capacity: self.capacity,
        })
    }
}

fn validate_capacity(capacity: Option<i32>) -> Result<(), AppError> {
    match capacity {
        Some(c) if c <= 0 => Err(AppError::ValidationError(
            "Building capacity must be greater than zero".to_string(),
        )),
        _ => Ok(()),
    }
}
