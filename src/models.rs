use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============ Listing Models ============

/// Kind of rental unit advertised by a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Apartment,
    House,
    Pg,
    Studio,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Pg => "pg",
            PropertyType::Studio => "studio",
        };
        f.write_str(label)
    }
}

/// Furnishing level of a rental unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Furnishing {
    Furnished,
    SemiFurnished,
    Unfurnished,
}

impl fmt::Display for Furnishing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Furnishing::Furnished => "furnished",
            Furnishing::SemiFurnished => "semi-furnished",
            Furnishing::Unfurnished => "unfurnished",
        };
        f.write_str(label)
    }
}

/// A single advertised rental unit.
///
/// Serialized in camelCase because the front end binds these fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// Opaque identifier assigned by the upstream aggregator.
    pub id: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Monthly rent in whole currency units. Always > 0.
    pub rent: u32,
    /// Kind of unit.
    pub property_type: PropertyType,
    /// Bedroom count. Always > 0.
    pub bedrooms: u32,
    /// Carpet area in square feet. Always > 0.
    pub area: f64,
    /// Furnishing level.
    pub furnished: Furnishing,
    /// Neighborhood or area name.
    pub locality: String,
    /// City name.
    pub city: String,
    /// Amenity labels, order irrelevant.
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Last time this record was refreshed.
    pub last_updated: DateTime<Utc>,
    /// Aggregator that supplied the record (e.g. "99acres").
    pub source: String,
    /// Free-text description shown on listing cards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the owner or broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Owner phone, E.164 once the fixture is loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_phone: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// ============ Query Models ============

/// Axis-aligned lat/lng rectangle. No antimeridian wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl RegionBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// True when all edges are finite, `north >= south` and `east >= west`.
    pub fn is_valid(&self) -> bool {
        let finite = [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite());
        finite && self.north >= self.south && self.east >= self.west
    }

    /// Inclusive containment test.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }
}

/// Search filters. Every field is optional; an absent field does not filter.
///
/// All supplied filters must match (AND). Rent thresholds compare against
/// the listed rent, before any live perturbation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Case-insensitive substring of the city name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Case-insensitive substring of the locality name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// Inclusive lower rent bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rent: Option<u32>,
    /// Inclusive upper rent bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rent: Option<u32>,
    /// Exact bedroom count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    /// Exact property type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    /// Exact furnishing level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub furnished: Option<Furnishing>,
}

impl SearchCriteria {
    /// Returns true when `listing` satisfies every supplied filter.
    pub fn matches(&self, listing: &ListingRecord) -> bool {
        if let Some(ref city) = self.city {
            if !contains_ignore_case(&listing.city, city) {
                return false;
            }
        }
        if let Some(ref locality) = self.locality {
            if !contains_ignore_case(&listing.locality, locality) {
                return false;
            }
        }
        if let Some(min) = self.min_rent {
            if listing.rent < min {
                return false;
            }
        }
        if let Some(max) = self.max_rent {
            if listing.rent > max {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if listing.bedrooms != bedrooms {
                return false;
            }
        }
        if let Some(property_type) = self.property_type {
            if listing.property_type != property_type {
                return false;
            }
        }
        if let Some(furnished) = self.furnished {
            if listing.furnished != furnished {
                return false;
            }
        }
        true
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============ Result Models ============

/// Aggregate rent figures for a city (optionally narrowed to a locality).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentAnalytics {
    /// Mean listed rent, rounded to the nearest unit.
    pub average_rent: u32,
    /// Upper-middle listed rent for even-sized subsets.
    pub median_rent: u32,
    /// sum(rent) / sum(area), unrounded.
    pub price_per_sqft: f64,
    /// Synthetic signed percentage in [-10, 10]. Placeholder, not derived
    /// from any period-over-period data.
    pub rent_trend: f64,
    /// Number of listings in the subset.
    pub total_listings: usize,
    /// When the figures were computed.
    pub last_updated: DateTime<Utc>,
}

/// Joined result of the per-source fan-out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesSnapshot {
    /// All partitions concatenated in source order, then fixture order.
    pub combined: Vec<ListingRecord>,
    /// Every configured source, empty for sources that failed.
    pub by_source: BTreeMap<String, Vec<ListingRecord>>,
}

/// Cache occupancy, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: u64,
    pub keys: Vec<String>,
}
