//! Typed filter predicate and paging for location search.
//!
//! A [`Predicate`] is parsed once from the raw query map and then rendered into
//! both the page query and its `COUNT(*)` companion, so the two always filter on
//! the same clauses with the same bind order. The in-memory store evaluates the
//! very same value through [`Predicate::matches`].

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

use crate::config::{NearbyConfig, SearchConfig};
use crate::error::{AppError, AppResult};
use crate::types::{Accessibility, Coordinates, Difficulty, Location, Season, TimeOfDay};

const LIKE_ESCAPE: char = '\\';
const MAX_SEARCH_CHARS: usize = 200;

/// One active search condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Category(i64),
    TimeOfDay(TimeOfDay),
    Season(Season),
    Accessibility(Accessibility),
    Difficulty(Difficulty),
    PermissionRequired(bool),
    /// Case-insensitive substring match on name OR description.
    Search(String),
}

impl Filter {
    fn push_clause(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Filter::Category(id) => {
                qb.push("l.category_id = ").push_bind(*id);
            }
            Filter::TimeOfDay(tag) => {
                qb.push("l.best_time_of_day = ").push_bind(tag.as_str());
            }
            Filter::Season(tag) => {
                qb.push("l.best_season = ").push_bind(tag.as_str());
            }
            Filter::Accessibility(tag) => {
                qb.push("l.accessibility = ").push_bind(tag.as_str());
            }
            Filter::Difficulty(tag) => {
                qb.push("l.difficulty_level = ").push_bind(tag.as_str());
            }
            Filter::PermissionRequired(flag) => {
                qb.push("l.permission_required = ").push_bind(*flag);
            }
            Filter::Search(term) => {
                let pattern = format!("%{}%", escape_like_pattern(term));
                qb.push("(l.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR l.description ILIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\')");
            }
        }
    }

    fn matches(&self, location: &Location) -> bool {
        match self {
            Filter::Category(id) => location.category_id == *id,
            Filter::TimeOfDay(tag) => location.best_time_of_day == Some(*tag),
            Filter::Season(tag) => location.best_season == Some(*tag),
            Filter::Accessibility(tag) => location.accessibility == Some(*tag),
            Filter::Difficulty(tag) => location.difficulty_level == Some(*tag),
            Filter::PermissionRequired(flag) => location.permission_required == *flag,
            Filter::Search(term) => {
                let needle = term.to_lowercase();
                location.name.to_lowercase().contains(&needle)
                    || location.description.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Conjunction of the filters present in a request. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    filters: Vec<Filter>,
}

impl Predicate {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Parses the recognized filter keys. Absent and empty values are skipped,
    /// unknown keys are ignored, malformed values are rejected.
    pub fn parse(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut filters = Vec::new();

        if let Some(raw) = present(params, "category_id") {
            let id = raw
                .parse::<i64>()
                .map_err(|_| AppError::validation("category_id", format!("'{}' is not an integer id", raw)))?;
            filters.push(Filter::Category(id));
        }
        if let Some(raw) = present(params, "best_time_of_day") {
            filters.push(Filter::TimeOfDay(parse_tag("best_time_of_day", raw)?));
        }
        if let Some(raw) = present(params, "best_season") {
            filters.push(Filter::Season(parse_tag("best_season", raw)?));
        }
        if let Some(raw) = present(params, "accessibility") {
            filters.push(Filter::Accessibility(parse_tag("accessibility", raw)?));
        }
        if let Some(raw) = present(params, "difficulty_level") {
            filters.push(Filter::Difficulty(parse_tag("difficulty_level", raw)?));
        }
        if let Some(raw) = present(params, "permission_required") {
            filters.push(Filter::PermissionRequired(parse_bool("permission_required", raw)?));
        }
        if let Some(raw) = present(params, "search") {
            let term = sanitize_search_term(raw)?;
            if !term.is_empty() {
                filters.push(Filter::Search(term));
            }
        }

        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Appends ` WHERE a AND b ...` (nothing when empty).
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.filters.is_empty() {
            return;
        }
        qb.push(" WHERE ");
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            filter.push_clause(qb);
        }
    }

    pub fn matches(&self, location: &Location) -> bool {
        self.filters.iter().all(|f| f.matches(location))
    }
}

/// Returns the trimmed value for `key` unless it is missing or blank.
fn present<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_tag<T>(field: &str, raw: &str) -> AppResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|msg| AppError::validation(field, msg))
}

fn parse_bool(field: &str, raw: &str) -> AppResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(AppError::validation(field, format!("expected 'true' or 'false', got '{}'", other))),
    }
}

fn parse_int(field: &str, raw: &str) -> AppResult<i64> {
    raw.parse::<i64>().map_err(|_| AppError::validation(field, format!("'{}' is not an integer", raw)))
}

fn parse_float(field: &str, raw: &str) -> AppResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::validation(field, format!("'{}' is not a number", raw)))
}

pub fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

fn sanitize_search_term(raw: &str) -> AppResult<String> {
    if raw.chars().count() > MAX_SEARCH_CHARS {
        return Err(AppError::validation("search", format!("must be at most {} characters", MAX_SEARCH_CHARS)));
    }
    let sanitized: String = raw.chars().filter(|ch| !ch.is_control() || ch.is_whitespace()).collect();
    Ok(sanitized.trim().to_string())
}

/// 1-based page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// `page` defaults to 1 and must be >= 1; `limit` defaults to the configured
    /// value and is clamped into `[1, max_limit]`. Pages past the end are allowed.
    pub fn parse(params: &HashMap<String, String>, cfg: &SearchConfig) -> AppResult<Self> {
        let page = match present(params, "page") {
            Some(raw) => parse_int("page", raw)?,
            None => 1,
        };
        if page < 1 {
            return Err(AppError::validation("page", "must be >= 1"));
        }
        let limit = match present(params, "limit") {
            Some(raw) => parse_int("limit", raw)?,
            None => cfg.default_limit,
        };
        Ok(Self { page, limit: limit.clamp(1, cfg.max_limit) })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Paging metadata returned alongside a result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, request: PageRequest) -> Self {
        let pages = if total <= 0 { 0 } else { (total + request.limit - 1) / request.limit };
        Self { total, page: request.page, limit: request.limit, pages }
    }
}

/// Response envelope of `GET /locations`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub locations: Vec<Location>,
    pub pagination: Pagination,
}

/// Center, radius and cap of a radius search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub center: Coordinates,
    pub radius_km: f64,
    pub limit: i64,
}

impl NearbyQuery {
    pub fn parse(params: &HashMap<String, String>, cfg: &NearbyConfig) -> AppResult<Self> {
        let (lat_raw, lon_raw) = match (present(params, "latitude"), present(params, "longitude")) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(AppError::validation(
                    "coordinates",
                    "latitude and longitude are both required",
                ))
            }
        };
        let center = Coordinates::new(parse_float("latitude", lat_raw)?, parse_float("longitude", lon_raw)?)?;

        let radius_km = match present(params, "radius") {
            Some(raw) => parse_float("radius", raw)?,
            None => cfg.default_radius_km,
        };
        if radius_km <= 0.0 {
            return Err(AppError::validation("radius", "must be > 0"));
        }
        if radius_km > cfg.max_radius_km {
            return Err(AppError::validation("radius", format!("must be <= {} km", cfg.max_radius_km)));
        }

        Ok(Self { center, radius_km, limit: cfg.max_results })
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_km * 1000.0
    }
}
