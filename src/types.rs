use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed set of snake_case tags stored as TEXT.
macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not one of: {}",
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

tag_enum!(
    /// Light conditions a spot is best photographed in.
    TimeOfDay {
        Sunrise => "sunrise",
        Morning => "morning",
        Midday => "midday",
        Afternoon => "afternoon",
        GoldenHour => "golden_hour",
        Sunset => "sunset",
        BlueHour => "blue_hour",
        Night => "night",
    }
);

tag_enum!(Season {
    Spring => "spring",
    Summer => "summer",
    Autumn => "autumn",
    Winter => "winter",
    Any => "any",
});

tag_enum!(
    /// How easy the spot is to reach.
    Accessibility {
        Easy => "easy",
        Moderate => "moderate",
        Difficult => "difficult",
    }
);

tag_enum!(Difficulty {
    Easy => "easy",
    Moderate => "moderate",
    Hard => "hard",
    Expert => "expert",
});

/// Fixed category set seeded into every store.
pub const DEFAULT_CATEGORIES: &[(i64, &str)] = &[
    (1, "Landscape"),
    (2, "Urban"),
    (3, "Architecture"),
    (4, "Wildlife"),
    (5, "Beach"),
    (6, "Mountain"),
    (7, "Night Sky"),
    (8, "Waterfall"),
    (9, "Historic"),
    (10, "Street"),
];

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A stored location, joined with its creator and category for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub best_time_of_day: Option<TimeOfDay>,
    pub best_season: Option<Season>,
    pub accessibility: Option<Accessibility>,
    pub difficulty_level: Option<Difficulty>,
    pub permission_required: bool,
    pub created_by: i64,
    pub creator_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A radius-search hit: the location plus its geodesic distance in kilometers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyLocation {
    #[serde(flatten)]
    pub location: Location,
    pub distance: f64,
}

// Raw request bodies. Everything is optional so that missing fields surface as
// validation errors instead of JSON rejections.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoordinatesInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<CoordinatesInput>,
    pub category_id: Option<i64>,
    pub best_time_of_day: Option<String>,
    pub best_season: Option<String>,
    pub accessibility: Option<String>,
    pub difficulty_level: Option<String>,
    pub permission_required: Option<bool>,
}

/// A validated insert.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub category_id: i64,
    pub best_time_of_day: Option<TimeOfDay>,
    pub best_season: Option<Season>,
    pub accessibility: Option<Accessibility>,
    pub difficulty_level: Option<Difficulty>,
    pub permission_required: bool,
    pub created_by: i64,
}

/// A validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub category_id: Option<i64>,
    pub best_time_of_day: Option<TimeOfDay>,
    pub best_season: Option<Season>,
    pub accessibility: Option<Accessibility>,
    pub difficulty_level: Option<Difficulty>,
    pub permission_required: Option<bool>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.address.is_none()
            && self.coordinates.is_none()
            && self.category_id.is_none()
            && self.best_time_of_day.is_none()
            && self.best_season.is_none()
            && self.accessibility.is_none()
            && self.difficulty_level.is_none()
            && self.permission_required.is_none()
    }

    /// Applies the supplied fields onto `location` in place.
    pub fn apply_to(&self, location: &mut Location) {
        if let Some(name) = &self.name {
            location.name = name.clone();
        }
        if let Some(description) = &self.description {
            location.description = description.clone();
        }
        if let Some(address) = &self.address {
            location.address = address.clone();
        }
        if let Some(coordinates) = self.coordinates {
            location.coordinates = coordinates;
        }
        if let Some(category_id) = self.category_id {
            location.category_id = category_id;
        }
        if self.best_time_of_day.is_some() {
            location.best_time_of_day = self.best_time_of_day;
        }
        if self.best_season.is_some() {
            location.best_season = self.best_season;
        }
        if self.accessibility.is_some() {
            location.accessibility = self.accessibility;
        }
        if self.difficulty_level.is_some() {
            location.difficulty_level = self.difficulty_level;
        }
        if let Some(flag) = self.permission_required {
            location.permission_required = flag;
        }
    }
}
