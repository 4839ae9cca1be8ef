use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::types::{Accessibility, Difficulty, Season, TimeOfDay, DEFAULT_CATEGORIES};

pub(crate) const CATEGORY_FKEY: &str = "locations_category_id_fkey";
pub(crate) const CREATOR_FKEY: &str = "locations_created_by_fkey";

/// Create a PostgreSQL connection pool.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Maximum number of connections in the pool
/// * `acquire_timeout_secs` - How long a request waits for a free connection
pub async fn connect(database_url: &str, max_connections: u32, acquire_timeout_secs: u64) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(database_url)
        .await
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    // PostGIS is required for the geography column - fail if it is missing
    sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis").execute(pool).await?;

    // users are owned by the auth service; only id/username/role are read here
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS categories (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"CREATE TABLE IF NOT EXISTS locations (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            address TEXT NOT NULL,
            coordinates GEOGRAPHY(POINT, 4326) NOT NULL,
            category_id BIGINT NOT NULL CONSTRAINT {CATEGORY_FKEY} REFERENCES categories(id),
            best_time_of_day TEXT NULL,
            best_season TEXT NULL,
            accessibility TEXT NULL,
            difficulty_level TEXT NULL,
            permission_required BOOLEAN NOT NULL DEFAULT FALSE,
            created_by BIGINT NOT NULL CONSTRAINT {CREATOR_FKEY} REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    for (id, name) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(*id)
            .bind(*name)
            .execute(pool)
            .await?;
    }

    // Tag columns only hold the known values. NOT VALID keeps pre-existing rows
    // readable; they are decoded leniently by the store.
    let checks = [
        tag_check("best_time_of_day", TimeOfDay::ALL.iter().map(|t| t.as_str())),
        tag_check("best_season", Season::ALL.iter().map(|t| t.as_str())),
        tag_check("accessibility", Accessibility::ALL.iter().map(|t| t.as_str())),
        tag_check("difficulty_level", Difficulty::ALL.iter().map(|t| t.as_str())),
    ];
    for (name, statement) in &checks {
        if let Err(e) = sqlx::query(statement.as_str()).execute(pool).await {
            if is_already_exists(&e) {
                tracing::debug!("Constraint {} already exists, skipping", name);
            } else {
                tracing::warn!("Failed to add constraint {}: {}", name, e);
            }
        }
    }

    let indexes = [
        ("idx_locations_coordinates", "CREATE INDEX IF NOT EXISTS idx_locations_coordinates ON locations USING GIST (coordinates)"),
        ("idx_locations_created", "CREATE INDEX IF NOT EXISTS idx_locations_created ON locations(created_at DESC, id DESC)"),
        ("idx_locations_category", "CREATE INDEX IF NOT EXISTS idx_locations_category ON locations(category_id)"),
        ("idx_locations_created_by", "CREATE INDEX IF NOT EXISTS idx_locations_created_by ON locations(created_by)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            if is_already_exists(&e) {
                tracing::debug!("Index {} already exists, skipping", name);
            } else {
                tracing::warn!("Failed to create index {}: {}", name, e);
            }
        }
    }

    Ok(())
}

fn is_already_exists(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message().to_lowercase();
            msg.contains("already exists") || msg.contains("duplicate")
        }
        _ => false,
    }
}

/// `(constraint name, ALTER TABLE statement)` restricting `column` to `allowed`.
fn tag_check<'a>(column: &str, allowed: impl Iterator<Item = &'a str>) -> (String, String) {
    let name = format!("locations_{}_check", column);
    let values = allowed.map(|v| format!("'{}'", v)).collect::<Vec<_>>().join(", ");
    let statement = format!(
        "ALTER TABLE locations ADD CONSTRAINT {name} CHECK ({column} IS NULL OR {column} IN ({values})) NOT VALID"
    );
    (name, statement)
}
