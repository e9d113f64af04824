//! Coordinates, great-circle distance and map marker models.

use serde::{Deserialize, Serialize};

use crate::sensor::FillStatus;
use crate::urgency::IndicatorColor;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default map centre when no bins are known (Da Nang city centre).
pub const DEFAULT_CENTER: Location = Location {
    lat: 16.070704,
    lon: 108.220329,
};

/// Default map zoom level.
pub const DEFAULT_ZOOM: u8 = 15;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &Location) -> f64 {
        let (lat1, lon1) = (self.lat.to_radians(), self.lon.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lon.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Marker status shown on the bin map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStatus {
    Normal,
    Warning,
    Critical,
}

impl MarkerStatus {
    pub fn color(self) -> IndicatorColor {
        match self {
            Self::Critical => IndicatorColor::Red,
            Self::Warning => IndicatorColor::Yellow,
            Self::Normal => IndicatorColor::Green,
        }
    }
}

impl From<FillStatus> for MarkerStatus {
    fn from(status: FillStatus) -> Self {
        match status {
            FillStatus::Full => Self::Critical,
            FillStatus::AlmostFull => Self::Warning,
            FillStatus::Empty => Self::Normal,
        }
    }
}

/// Everything the mapping provider needs to draw one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub label: String,
    pub position: Location,
    pub fill_level: u8,
    pub status: MarkerStatus,
}

impl MapMarker {
    pub fn new(id: impl Into<String>, label: impl Into<String>, position: Location, fill_level: u8) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position,
            fill_level,
            status: FillStatus::from_fill_level(fill_level).into(),
        }
    }

    /// Marker fill colour as hex.
    pub fn color_hex(&self) -> &'static str {
        self.status.color().hex()
    }
}

/// Centre of a set of markers, or [`DEFAULT_CENTER`] when empty.
pub fn center_of(markers: &[MapMarker]) -> Location {
    if markers.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = markers.len() as f64;
    let (lat, lon) = markers
        .iter()
        .fold((0.0, 0.0), |(lat, lon), m| (lat + m.position.lat, lon + m.position.lon));
    Location::new(lat / n, lon / n)
}
