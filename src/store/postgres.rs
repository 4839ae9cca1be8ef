use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::warn;

use super::{LocationStore, StoreError};
use crate::db::{CATEGORY_FKEY, CREATOR_FKEY};
use crate::query::{NearbyQuery, PageRequest, Predicate};
use crate::types::{Category, Coordinates, Location, LocationPatch, NearbyLocation, NewLocation};

/// Columns of a joined location row. Always paired with [`FROM_JOINED`].
const SELECT_COLUMNS: &str = "SELECT l.id, l.name, l.description, l.address, \
     ST_Y(l.coordinates::geometry) AS latitude, ST_X(l.coordinates::geometry) AS longitude, \
     l.category_id, c.name AS category_name, \
     l.best_time_of_day, l.best_season, l.accessibility, l.difficulty_level, \
     l.permission_required, l.created_by, u.username AS creator_username, \
     l.created_at, l.updated_at";

const FROM_JOINED: &str = " FROM locations l \
     LEFT JOIN users u ON u.id = l.created_by \
     LEFT JOIN categories c ON c.id = l.category_id";

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, FromRow)]
struct LocationRow {
    id: i64,
    name: String,
    description: String,
    address: String,
    latitude: f64,
    longitude: f64,
    category_id: i64,
    category_name: Option<String>,
    best_time_of_day: Option<String>,
    best_season: Option<String>,
    accessibility: Option<String>,
    difficulty_level: Option<String>,
    permission_required: bool,
    created_by: i64,
    creator_username: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct NearbyRow {
    #[sqlx(flatten)]
    row: LocationRow,
    distance: f64,
}

/// Unknown tag values (rows predating the CHECK constraints) read as absent.
fn decode_tag<T>(id: i64, column: &str, value: Option<String>) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw = value?;
    match raw.parse::<T>() {
        Ok(tag) => Some(tag),
        Err(e) => {
            warn!(location = id, column, "ignoring stored tag: {}", e);
            None
        }
    }
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id,
            name: row.name,
            description: row.description,
            address: row.address,
            coordinates: Coordinates { latitude: row.latitude, longitude: row.longitude },
            category_id: row.category_id,
            category_name: row.category_name,
            best_time_of_day: decode_tag(row.id, "best_time_of_day", row.best_time_of_day),
            best_season: decode_tag(row.id, "best_season", row.best_season),
            accessibility: decode_tag(row.id, "accessibility", row.accessibility),
            difficulty_level: decode_tag(row.id, "difficulty_level", row.difficulty_level),
            permission_required: row.permission_required,
            created_by: row.created_by,
            creator_username: row.creator_username,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Ids a write refers to, used to name the offending reference.
#[derive(Debug, Clone, Copy, Default)]
struct References {
    category_id: Option<i64>,
    created_by: Option<i64>,
}

fn map_write_error(err: sqlx::Error, refs: References) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return foreign_key_violation(db_err.constraint(), refs);
        }
    }
    StoreError::Sqlx(err)
}

fn foreign_key_violation(constraint: Option<&str>, refs: References) -> StoreError {
    match (constraint, refs) {
        (Some(CATEGORY_FKEY), References { category_id: Some(id), .. }) => StoreError::UnknownCategory(id),
        (Some(CREATOR_FKEY), References { created_by: Some(id), .. }) => StoreError::UnknownUser(id),
        (name, _) => StoreError::Constraint(name.unwrap_or("unnamed foreign key").to_string()),
    }
}

/// `UPDATE ... SET` touching only the supplied fields plus `updated_at`.
fn update_query(id: i64, patch: LocationPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE locations SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(name) = patch.name {
            set.push("name = ").push_bind_unseparated(name);
        }
        if let Some(description) = patch.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(address) = patch.address {
            set.push("address = ").push_bind_unseparated(address);
        }
        if let Some(coordinates) = patch.coordinates {
            set.push("coordinates = ST_SetSRID(ST_MakePoint(")
                .push_bind_unseparated(coordinates.longitude)
                .push_unseparated(", ")
                .push_bind_unseparated(coordinates.latitude)
                .push_unseparated("), 4326)::geography");
        }
        if let Some(category_id) = patch.category_id {
            set.push("category_id = ").push_bind_unseparated(category_id);
        }
        if let Some(tag) = patch.best_time_of_day {
            set.push("best_time_of_day = ").push_bind_unseparated(tag.as_str());
        }
        if let Some(tag) = patch.best_season {
            set.push("best_season = ").push_bind_unseparated(tag.as_str());
        }
        if let Some(tag) = patch.accessibility {
            set.push("accessibility = ").push_bind_unseparated(tag.as_str());
        }
        if let Some(tag) = patch.difficulty_level {
            set.push("difficulty_level = ").push_bind_unseparated(tag.as_str());
        }
        if let Some(flag) = patch.permission_required {
            set.push("permission_required = ").push_bind_unseparated(flag);
        }
        set.push("updated_at = NOW()");
    }
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING id");
    qb
}

/// PostGIS-backed store. Coordinates live in a `GEOGRAPHY(POINT, 4326)` column.
#[derive(Clone)]
pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn search(&self, predicate: &Predicate, page: PageRequest) -> Result<(Vec<Location>, i64), StoreError> {
        let mut data = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        data.push(FROM_JOINED);
        predicate.push_where(&mut data);
        data.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        // The joins never filter rows, so the count runs on the bare table.
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS cnt FROM locations l");
        predicate.push_where(&mut count);

        let (rows, total_row) = futures::try_join!(
            data.build_query_as::<LocationRow>().fetch_all(&self.pool),
            count.build().fetch_one(&self.pool),
        )?;
        let total: i64 = total_row.try_get("cnt")?;

        Ok((rows.into_iter().map(Location::from).collect(), total))
    }

    async fn get(&self, id: i64) -> Result<Option<Location>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        qb.push(FROM_JOINED).push(" WHERE l.id = ").push_bind(id);
        let row = qb.build_query_as::<LocationRow>().fetch_optional(&self.pool).await?;
        Ok(row.map(Location::from))
    }

    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<NearbyLocation>, StoreError> {
        // ST_DWithin on geography is answered from the GiST index; ST_Distance is
        // only evaluated for the survivors.
        let sql = format!(
            "{SELECT_COLUMNS}, \
             ST_Distance(l.coordinates, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) / 1000.0 AS distance\
             {FROM_JOINED} \
             WHERE ST_DWithin(l.coordinates, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3) \
             ORDER BY distance ASC, l.id ASC \
             LIMIT $4"
        );
        let rows = sqlx::query_as::<_, NearbyRow>(&sql)
            .bind(query.center.longitude)
            .bind(query.center.latitude)
            .bind(query.radius_m())
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| NearbyLocation { location: r.row.into(), distance: r.distance }).collect())
    }

    async fn create(&self, new: NewLocation) -> Result<Location, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO locations (
                name, description, address, coordinates, category_id,
                best_time_of_day, best_season, accessibility, difficulty_level,
                permission_required, created_by
            ) VALUES (
                $1, $2, $3, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography, $6,
                $7, $8, $9, $10, $11, $12
            ) RETURNING id"#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.address)
        .bind(new.coordinates.longitude)
        .bind(new.coordinates.latitude)
        .bind(new.category_id)
        .bind(new.best_time_of_day.map(|t| t.as_str()))
        .bind(new.best_season.map(|t| t.as_str()))
        .bind(new.accessibility.map(|t| t.as_str()))
        .bind(new.difficulty_level.map(|t| t.as_str()))
        .bind(new.permission_required)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, References { category_id: Some(new.category_id), created_by: Some(new.created_by) })
        })?;

        self.get(id).await?.ok_or(StoreError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn update(&self, id: i64, patch: LocationPatch) -> Result<Option<Location>, StoreError> {
        let refs = References { category_id: patch.category_id, created_by: None };
        let mut qb = update_query(id, patch);
        let updated = qb.build().fetch_optional(&self.pool).await.map_err(|e| map_write_error(e, refs))?;
        if updated.is_none() {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id").fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| Ok(Category { id: r.try_get("id")?, name: r.try_get("name")? }))
            .collect()
    }
}
