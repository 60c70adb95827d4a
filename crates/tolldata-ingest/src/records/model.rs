//! Validated toll-rate record
//!
//! The exports are human-authored, so validation is total: every field has
//! a default and a malformed value degrades to that default instead of
//! rejecting the row. No input row is ever dropped.

use serde::{Deserialize, Serialize};

/// Kind of toll facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FacilityType {
    #[default]
    Other,
    Bridge,
    Tunnel,
    Road,
}

impl FacilityType {
    /// Unrecognized values map to `Other`.
    pub fn from_raw(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "bridge" => FacilityType::Bridge,
            "tunnel" => FacilityType::Tunnel,
            "road" => FacilityType::Road,
            _ => FacilityType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::Other => "Other",
            FacilityType::Bridge => "Bridge",
            FacilityType::Tunnel => "Tunnel",
            FacilityType::Road => "Road",
        }
    }
}

/// One validated toll-rate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TollRateRecord {
    pub state_or_province: String,
    pub facility_label: String,
    pub toll_operator: String,
    pub facility_type: FacilityType,
    pub road_type: String,
    pub interstate: bool,
    pub facility_open_date: String,
    pub revenue_lane_miles: f64,
    pub revenue: f64,
    pub length_miles: f64,
    pub lane: f64,
    pub source_type: String,
    pub reference: String,
    pub year: i32,
}

/// `"yes"` in any casing is true; everything else, including absent, is false.
pub fn coerce_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

/// Parse a non-negative amount, tolerating thousands separators
/// (`"1,234.50"` -> 1234.5). Malformed or negative values default to 0.0.
pub fn coerce_amount(value: &str) -> f64 {
    value
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| *v >= 0.0)
        .unwrap_or(0.0)
}

/// Parse a year, defaulting to 0 on failure.
pub fn coerce_year(value: &str) -> i32 {
    value.trim().parse().unwrap_or(0)
}
