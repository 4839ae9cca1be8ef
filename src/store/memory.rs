use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{LocationStore, StoreError};
use crate::geo::{self, BoundingBox};
use crate::query::{NearbyQuery, PageRequest, Predicate};
use crate::types::{Category, Location, LocationPatch, NearbyLocation, NewLocation, DEFAULT_CATEGORIES};

#[derive(Default)]
struct Tables {
    locations: Vec<Location>,
    categories: Vec<Category>,
    users: HashMap<i64, String>,
    next_id: i64,
}

/// Process-local store evaluating the same [`Predicate`] as the SQL backend.
///
/// Nearby search narrows candidates with a [`BoundingBox`] before computing
/// haversine distances.
#[derive(Clone)]
pub struct MemoryLocationStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl Default for MemoryLocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLocationStore {
    /// An empty store with the default category set.
    pub fn new() -> Self {
        let categories =
            DEFAULT_CATEGORIES.iter().map(|(id, name)| Category { id: *id, name: name.to_string() }).collect();
        Self {
            tables: Arc::new(RwLock::new(Tables { categories, next_id: 1, ..Default::default() })),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers a user. Like the `created_by` foreign key, creating a location
    /// for an unregistered user fails.
    pub async fn add_user(&self, id: i64, username: &str) {
        self.tables.write().await.users.insert(id, username.to_string());
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.locations.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl Tables {
    fn category_name(&self, id: i64) -> Option<String> {
        self.categories.iter().find(|c| c.id == id).map(|c| c.name.clone())
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn search(&self, predicate: &Predicate, page: PageRequest) -> Result<(Vec<Location>, i64), StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;

        let mut matched: Vec<&Location> = tables.locations.iter().filter(|l| predicate.matches(l)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matched.len() as i64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(0);
        let rows = matched.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((rows, total))
    }

    async fn get(&self, id: i64) -> Result<Option<Location>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<NearbyLocation>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let bbox = BoundingBox::around(query.center, query.radius_km);

        let mut hits: Vec<NearbyLocation> = tables
            .locations
            .iter()
            .filter(|l| bbox.contains(l.coordinates))
            .map(|l| NearbyLocation { location: l.clone(), distance: geo::distance_km(query.center, l.coordinates) })
            .filter(|hit| hit.distance <= query.radius_km)
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.location.id.cmp(&b.location.id)));
        hits.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(hits)
    }

    async fn create(&self, new: NewLocation) -> Result<Location, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let category_name =
            tables.category_name(new.category_id).ok_or(StoreError::UnknownCategory(new.category_id))?;
        let creator_username =
            tables.users.get(&new.created_by).cloned().ok_or(StoreError::UnknownUser(new.created_by))?;

        let now = Utc::now();
        let location = Location {
            id: tables.next_id,
            name: new.name,
            description: new.description,
            address: new.address,
            coordinates: new.coordinates,
            category_id: new.category_id,
            category_name: Some(category_name),
            best_time_of_day: new.best_time_of_day,
            best_season: new.best_season,
            accessibility: new.accessibility,
            difficulty_level: new.difficulty_level,
            permission_required: new.permission_required,
            created_by: new.created_by,
            creator_username: Some(creator_username),
            created_at: now,
            updated_at: now,
        };
        tables.next_id += 1;
        tables.locations.push(location.clone());
        Ok(location)
    }

    async fn update(&self, id: i64, patch: LocationPatch) -> Result<Option<Location>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        let category_name = match patch.category_id {
            Some(category_id) => Some(
                tables.category_name(category_id).ok_or(StoreError::UnknownCategory(category_id))?,
            ),
            None => None,
        };

        let Some(location) = tables.locations.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        patch.apply_to(location);
        if category_name.is_some() {
            location.category_name = category_name;
        }
        location.updated_at = Utc::now();
        Ok(Some(location.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let before = tables.locations.len();
        tables.locations.retain(|l| l.id != id);
        Ok(tables.locations.len() < before)
    }

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.categories.iter().any(|c| c.id == id))
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.categories.clone())
    }
}
