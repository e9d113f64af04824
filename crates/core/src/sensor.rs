//! Sensor readings pushed by the bins and the fill-level rules derived
//! from them.
//!
//! The ultrasonic sensor measures the distance from the lid to the top of
//! the rubbish, so a *smaller* distance means a fuller bin.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::urgency::IndicatorColor;

// ---------------------------------------------------------------------------
// Fill level
// ---------------------------------------------------------------------------

/// Distance reading (mm) of an empty bin.
pub const EMPTY_DISTANCE_MM: f64 = 150.0;
/// Distance reading (mm) of a full bin.
pub const FULL_DISTANCE_MM: f64 = 20.0;

/// Fill level above which a bin needs collecting.
pub const FULL_THRESHOLD_PCT: u8 = 70;
/// Fill level above which a bin is almost full.
pub const ALMOST_FULL_THRESHOLD_PCT: u8 = 40;

/// Convert a distance reading into a fill percentage in `0..=100`.
///
/// `round((EMPTY - d) / (EMPTY - FULL) * 100)`, clamped.
pub fn fill_level_from_distance(distance_mm: f64) -> u8 {
    let ratio = (EMPTY_DISTANCE_MM - distance_mm) / (EMPTY_DISTANCE_MM - FULL_DISTANCE_MM);
    // NaN saturates to 0 on the cast.
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Coarse bin status derived from the fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    Empty,
    AlmostFull,
    Full,
}

impl FillStatus {
    pub fn from_fill_level(fill_pct: u8) -> Self {
        if fill_pct > FULL_THRESHOLD_PCT {
            Self::Full
        } else if fill_pct > ALMOST_FULL_THRESHOLD_PCT {
            Self::AlmostFull
        } else {
            Self::Empty
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "Full (needs collection)",
            Self::AlmostFull => "Almost full",
            Self::Empty => "Empty",
        }
    }

    pub fn color(self) -> IndicatorColor {
        match self {
            Self::Full => IndicatorColor::Red,
            Self::AlmostFull => IndicatorColor::Yellow,
            Self::Empty => IndicatorColor::Green,
        }
    }
}

// ---------------------------------------------------------------------------
// Live readings
// ---------------------------------------------------------------------------

/// The known measurement fields of a sensor payload.
///
/// Devices are not consistent about key names, hence the aliases. Keys
/// that match none of the known fields land in [`extra`](Self::extra).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<bool>,
    #[serde(default, alias = "d", alias = "dist", skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, alias = "g", skip_serializing_if = "Option::is_none")]
    pub gas: Option<f64>,
    #[serde(
        default,
        alias = "isDetectedHuman",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_detected_human: Option<bool>,
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "nodeName", skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Unrecognized keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One reading received over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    /// Locally generated id, unique per received reading.
    pub id: String,
    pub received_at: Timestamp,
    #[serde(flatten)]
    pub values: SensorValues,
}

impl SensorReading {
    /// Build a reading from a live-channel payload.
    ///
    /// The payload must be a JSON object; known keys with the wrong type
    /// are rejected.
    pub fn from_payload(payload: &Value, received_at: Timestamp) -> Result<Self, CoreError> {
        if !payload.is_object() {
            return Err(CoreError::MalformedPayload(format!(
                "expected a JSON object, got {payload}"
            )));
        }
        let values = SensorValues::deserialize(payload)
            .map_err(|e| CoreError::MalformedPayload(e.to_string()))?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            received_at,
            values,
        })
    }

    /// Fill level derived from the distance field, if present.
    pub fn fill_level(&self) -> Option<u8> {
        self.values.distance.map(fill_level_from_distance)
    }

    /// Look up a measurement by key, falling back to the extra map.
    pub fn value(&self, key: &str) -> Option<Value> {
        let v = &self.values;
        let known = match key {
            "temperature" => v.temperature.map(Value::from),
            "humidity" => v.humidity.map(Value::from),
            "pressure" => v.pressure.map(Value::from),
            "light" => v.light.map(Value::from),
            "motion" => v.motion.map(Value::from),
            "distance" => v.distance.map(Value::from),
            "gas" => v.gas.map(Value::from),
            "is_detected_human" => v.is_detected_human.map(Value::from),
            "latitude" => v.latitude.map(Value::from),
            "longitude" => v.longitude.map(Value::from),
            "node" => v.node.clone().map(Value::from),
            _ => None,
        };
        known.or_else(|| v.extra.get(key).cloned())
    }
}

/// Format a measurement for display, choosing the unit from the key name.
pub fn format_value(key: &str, value: &Value) -> String {
    match value {
        Value::Number(n) => {
            let n = n.as_f64().unwrap_or_default();
            let key = key.to_ascii_lowercase();
            if key.contains("temp") {
                format!("{n:.2}°C")
            } else if key.contains("humid") {
                format!("{n:.1}%")
            } else if key.contains("press") {
                format!("{n:.2} hPa")
            } else if key.contains("light") {
                format!("{n:.0} lux")
            } else {
                format!("{n:.2}")
            }
        }
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
