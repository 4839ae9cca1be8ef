use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    middleware::ip::ClientIp,
    query::SearchPage,
    state::{AppState, CREATE_LOCATION_ENDPOINT, NEARBY_ENDPOINT},
    types::{Location, LocationInput, NearbyLocation},
};

// Extractor rejections are turned into AppError so every failure carries the
// same JSON body.

fn params(query: Result<Query<HashMap<String, String>>, QueryRejection>) -> AppResult<HashMap<String, String>> {
    query.map(|Query(p)| p).map_err(|e| AppError::BadRequest(e.body_text()))
}

fn location_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id).map_err(|_| AppError::validation("id", "must be an integer"))
}

fn body(payload: Result<Json<LocationInput>, JsonRejection>) -> AppResult<LocationInput> {
    payload.map(|Json(input)| input).map_err(|e| AppError::BadRequest(e.body_text()))
}

/// `GET /locations`
pub async fn search_locations(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> AppResult<Json<SearchPage>> {
    let params = params(query)?;
    Ok(Json(state.engine.search(&params).await?))
}

/// `GET /locations/{id}`
pub async fn get_location(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Location>> {
    let id = location_id(path)?;
    Ok(Json(state.engine.get(id).await?))
}

/// `GET /nearby-locations?latitude=&longitude=&radius=`
pub async fn nearby_locations(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> AppResult<Json<Vec<NearbyLocation>>> {
    state.rate_limiter.check_endpoint_limit(NEARBY_ENDPOINT, ip).await?;
    let params = params(query)?;
    Ok(Json(state.engine.nearby(&params).await?))
}

/// `POST /locations`
pub async fn create_location(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: AuthUser,
    payload: Result<Json<LocationInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    state.rate_limiter.check_endpoint_limit(CREATE_LOCATION_ENDPOINT, ip).await?;
    let input = body(payload)?;
    let location = state.engine.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// `PUT /locations/{id}`
pub async fn update_location(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    user: AuthUser,
    payload: Result<Json<LocationInput>, JsonRejection>,
) -> AppResult<Json<Location>> {
    let id = location_id(path)?;
    let input = body(payload)?;
    Ok(Json(state.engine.update(&user, id, input).await?))
}

/// `DELETE /locations/{id}`
pub async fn delete_location(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let id = location_id(path)?;
    state.engine.delete(&user, id).await?;
    Ok(Json(json!({ "message": "Location deleted successfully" })))
}
