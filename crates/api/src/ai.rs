//! Client for the AI prediction and route-optimization service.
//!
//! The service speaks snake_case JSON and reports errors as
//! `{"detail": "..."}`. It does not take a bearer token.

use std::collections::HashMap;
use std::time::Duration;

use binwatch_core::geo::Location;
use binwatch_core::urgency::Urgency;
use serde::{Deserialize, Serialize};

use crate::client::{parse_response, DEFAULT_TIMEOUT};
use crate::error::ApiError;

/// Fill rate assumed when no history is available (mm per hour).
pub const DEFAULT_FILL_RATE_MM_PER_HOUR: f64 = 2.5;

/// Default cap on stops for one route.
pub const DEFAULT_MAX_STOPS: u32 = 10;

/// Body of `POST /api/ai/predict-fullness`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub node_id: String,
    pub current_level_mm: f64,
    pub fill_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_fill_rate: Option<f64>,
}

/// Projected time until a bin is full.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Prediction {
    pub node_id: String,
    pub hours_until_full: f64,
    pub predicted_full_at: String,
    /// In `0.0..=1.0`.
    pub confidence: f64,
    #[serde(default)]
    pub recommendation: String,
    /// Kept as the raw wire string; see [`urgency_level`](Self::urgency_level).
    pub urgency: String,
}

impl Prediction {
    /// Parsed urgency. Unknown values count as low.
    pub fn urgency_level(&self) -> Urgency {
        Urgency::parse_lenient(&self.urgency)
    }

    /// Confidence as a whole percentage.
    pub fn confidence_pct(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// A bin offered to the route optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinToCollect {
    pub node_id: String,
    pub location: Location,
    pub fill_percentage: f64,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_full_hours: Option<f64>,
}

/// Body of `POST /api/ai/optimize-route`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequest {
    pub start_location: Location,
    pub bins: Vec<BinToCollect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stops: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_hours: Option<f64>,
}

/// One stop on an optimized route.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteStop {
    pub stop_number: u32,
    pub node_id: String,
    pub location: Location,
    pub estimated_arrival: String,
    pub collection_time_minutes: u32,
    #[serde(default)]
    pub reason: String,
    pub fill_percentage: f64,
}

/// The optimizer's answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OptimizedRoute {
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
    pub estimated_fuel_cost_vnd: f64,
    pub sequence: Vec<RouteStop>,
    #[serde(default)]
    pub return_to_start: String,
    #[serde(default)]
    pub savings: HashMap<String, String>,
}

/// HTTP client for the AI service.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AiClient {
    /// `base_url` is the service root, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn predict_fullness(&self, request: &PredictionRequest) -> Result<Prediction, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/ai/predict-fullness", self.base_url))
            .json(request)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn optimize_route(&self, request: &RouteRequest) -> Result<OptimizedRoute, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/ai/optimize-route", self.base_url))
            .json(request)
            .send()
            .await?;
        parse_response(response).await
    }
}
