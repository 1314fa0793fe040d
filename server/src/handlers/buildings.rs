use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::{CreateBuildingRequest, UpdateBuildingRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn list_buildings(State(state): State<AppState>) -> Result<Response, AppError> {
    let buildings = state.buildings.list_buildings().await?;
    Ok(success(buildings, "Buildings retrieved"))
}

pub async fn get_building(
    State(state): State<AppState>,
    Path(building_id): Path<i64>,
) -> Result<Response, AppError> {
    let building = state.buildings.get_building(building_id).await?;
    Ok(success(building, "Building retrieved"))
}

pub async fn create_building(
    State(state): State<AppState>,
    payload: Result<Json<CreateBuildingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let building = state.buildings.create_building(request.validate()?).await?;
    tracing::info!(building_id = building.id, "Building created");
    Ok(created(building, "Building created"))
}

pub async fn update_building(
    State(state): State<AppState>,
    Path(building_id): Path<i64>,
    payload: Result<Json<UpdateBuildingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let building = state
        .buildings
        .update_building(building_id, request.validate()?)
        .await?;
    Ok(success(building, "Building updated"))
}

pub async fn delete_building(
    State(state): State<AppState>,
    Path(building_id): Path<i64>,
) -> Result<Response, AppError> {
    state.buildings.delete_building(building_id).await?;
    tracing::info!(building_id, "Building deleted");
    Ok(empty_success("Building deleted"))
}
