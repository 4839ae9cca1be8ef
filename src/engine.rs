//! Location query engine.
//!
//! Parses raw request parameters into typed queries, enforces ownership on
//! writes and delegates storage to an injected [`LocationStore`]. Store failures
//! pass through untouched; there are no retries here.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::config::{NearbyConfig, SearchConfig};
use crate::error::{AppError, AppResult, OptionExt};
use crate::metrics::Metrics;
use crate::query::{NearbyQuery, PageRequest, Pagination, Predicate, SearchPage};
use crate::store::{LocationStore, StoreError};
use crate::types::{
    Category, Coordinates, CoordinatesInput, Location, LocationInput, LocationPatch, NearbyLocation, NewLocation,
};

#[derive(Clone)]
pub struct LocationEngine {
    store: Arc<dyn LocationStore>,
    search: SearchConfig,
    nearby: NearbyConfig,
    metrics: Metrics,
}

impl LocationEngine {
    pub fn new(store: Arc<dyn LocationStore>, search: SearchConfig, nearby: NearbyConfig, metrics: Metrics) -> Self {
        Self { store, search, nearby, metrics }
    }

    pub fn store(&self) -> &Arc<dyn LocationStore> {
        &self.store
    }

    /// Filtered, paginated listing, newest first.
    pub async fn search(&self, params: &HashMap<String, String>) -> AppResult<SearchPage> {
        let predicate = Predicate::parse(params)?;
        let page = PageRequest::parse(params, &self.search)?;
        debug!(filters = predicate.filters().len(), page = page.page, limit = page.limit, "location search");

        let (locations, total) = self.store.search(&predicate, page).await.map_err(|e| self.store_error(e))?;
        self.metrics.inc_searches();
        Ok(SearchPage { locations, pagination: Pagination::new(total, page) })
    }

    pub async fn get(&self, id: i64) -> AppResult<Location> {
        self.store.get(id).await.map_err(|e| self.store_error(e))?.ok_or_not_found("Location")
    }

    /// Locations within the radius, nearest first, capped at the configured maximum.
    pub async fn nearby(&self, params: &HashMap<String, String>) -> AppResult<Vec<NearbyLocation>> {
        let query = NearbyQuery::parse(params, &self.nearby)?;
        debug!(
            latitude = query.center.latitude,
            longitude = query.center.longitude,
            radius_km = query.radius_km,
            "nearby search"
        );
        let hits = self.store.nearby(&query).await.map_err(|e| self.store_error(e))?;
        self.metrics.inc_nearby_searches();
        Ok(hits)
    }

    pub async fn create(&self, user: &AuthUser, input: LocationInput) -> AppResult<Location> {
        let new = validate_new(input, user.id)?;
        self.ensure_category(new.category_id).await?;

        let location = self.store.create(new).await.map_err(|e| self.store_error(e))?;
        self.metrics.inc_created();
        info!(id = location.id, user = user.id, "location created");
        Ok(location)
    }

    /// Partial update; only supplied fields change. Concurrent updates are
    /// last-writer-wins.
    pub async fn update(&self, user: &AuthUser, id: i64, input: LocationInput) -> AppResult<Location> {
        let patch = validate_patch(input)?;
        let existing = self.get(id).await?;
        authorize(user, &existing)?;

        if patch.is_empty() {
            return Ok(existing);
        }
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id).await?;
        }

        let location = self
            .store
            .update(id, patch)
            .await
            .map_err(|e| self.store_error(e))?
            .ok_or_not_found("Location")?;
        self.metrics.inc_updated();
        info!(id, user = user.id, "location updated");
        Ok(location)
    }

    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        let existing = self.get(id).await?;
        authorize(user, &existing)?;

        if !self.store.delete(id).await.map_err(|e| self.store_error(e))? {
            return Err(AppError::NotFound("Location not found".to_string()));
        }
        self.metrics.inc_deleted();
        info!(id, user = user.id, "location deleted");
        Ok(())
    }

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        self.store.categories().await.map_err(|e| self.store_error(e))
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await.map_err(|e| self.store_error(e))
    }

    async fn ensure_category(&self, category_id: i64) -> AppResult<()> {
        if !self.store.category_exists(category_id).await.map_err(|e| self.store_error(e))? {
            return Err(AppError::validation("category_id", format!("category {} does not exist", category_id)));
        }
        Ok(())
    }

    fn store_error(&self, err: StoreError) -> AppError {
        if !err.is_rejection() {
            self.metrics.inc_store_errors();
        }
        err.into()
    }
}

fn authorize(user: &AuthUser, location: &Location) -> AppResult<()> {
    if user.can_modify(location.created_by) {
        Ok(())
    } else {
        debug!(id = location.id, user = user.id, "modification refused");
        Err(AppError::Forbidden("Only the creator or an administrator may modify this location".to_string()))
    }
}

fn required_text(field: &str, value: Option<String>) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(field, "is required")),
    }
}

fn optional_text(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(AppError::validation(field, "must not be empty")),
        other => Ok(other),
    }
}

fn parse_coordinates(input: CoordinatesInput) -> AppResult<Coordinates> {
    match (input.latitude, input.longitude) {
        (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude),
        _ => Err(AppError::validation("coordinates", "latitude and longitude must be supplied together")),
    }
}

fn tag<T>(field: &str, value: Option<String>) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|msg| AppError::validation(field, msg)),
    }
}

fn validate_new(input: LocationInput, created_by: i64) -> AppResult<NewLocation> {
    let name = required_text("name", input.name)?;
    let description = required_text("description", input.description)?;
    let coordinates = parse_coordinates(input.coordinates.ok_or_else(|| AppError::validation("coordinates", "is required"))?)?;
    let address = required_text("address", input.address)?;
    let category_id = input.category_id.ok_or_else(|| AppError::validation("category_id", "is required"))?;

    Ok(NewLocation {
        name,
        description,
        address,
        coordinates,
        category_id,
        best_time_of_day: tag("best_time_of_day", input.best_time_of_day)?,
        best_season: tag("best_season", input.best_season)?,
        accessibility: tag("accessibility", input.accessibility)?,
        difficulty_level: tag("difficulty_level", input.difficulty_level)?,
        permission_required: input.permission_required.unwrap_or(false),
        created_by,
    })
}

fn validate_patch(input: LocationInput) -> AppResult<LocationPatch> {
    Ok(LocationPatch {
        name: optional_text("name", input.name)?,
        description: optional_text("description", input.description)?,
        address: optional_text("address", input.address)?,
        coordinates: input.coordinates.map(parse_coordinates).transpose()?,
        category_id: input.category_id,
        best_time_of_day: tag("best_time_of_day", input.best_time_of_day)?,
        best_season: tag("best_season", input.best_season)?,
        accessibility: tag("accessibility", input.accessibility)?,
        difficulty_level: tag("difficulty_level", input.difficulty_level)?,
        permission_required: input.permission_required,
    })
}
