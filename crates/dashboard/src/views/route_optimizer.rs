//! Collection route planning.

use std::collections::BTreeSet;

use binwatch_api::ai::{BinToCollect, OptimizedRoute, RouteRequest, DEFAULT_MAX_STOPS};
use binwatch_api::AiClient;
use binwatch_core::geo::Location;

use crate::error::ViewError;

pub const MSG_SELECT_AT_LEAST_ONE: &str = "Please select at least one bin to collect";
const ROUTE_FAILED: &str = "Route optimization failed. Make sure the AI service is running.";

pub struct RouteOptimizer {
    ai: AiClient,
    start: Location,
    max_stops: u32,
    available: Vec<BinToCollect>,
    selected: BTreeSet<String>,
    route: Option<OptimizedRoute>,
    error: Option<ViewError>,
}

impl RouteOptimizer {
    pub fn new(ai: AiClient, start: Location) -> Self {
        Self {
            ai,
            start,
            max_stops: DEFAULT_MAX_STOPS,
            available: Vec::new(),
            selected: BTreeSet::new(),
            route: None,
            error: None,
        }
    }

    pub fn with_max_stops(mut self, max_stops: u32) -> Self {
        self.max_stops = max_stops;
        self
    }

    pub fn start(&self) -> Location {
        self.start
    }

    pub fn set_start(&mut self, start: Location) {
        self.start = start;
    }

    /// Offer a new set of bins. Every bin starts out selected.
    pub fn set_available(&mut self, bins: Vec<BinToCollect>) {
        self.selected = bins.iter().map(|b| b.node_id.clone()).collect();
        self.available = bins;
    }

    pub fn available(&self) -> &[BinToCollect] {
        &self.available
    }

    /// Flip selection of one bin. Returns whether it is now selected.
    pub fn toggle(&mut self, node_id: &str) -> bool {
        if self.selected.remove(node_id) {
            false
        } else if self.available.iter().any(|b| b.node_id == node_id) {
            self.selected.insert(node_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_selected(&self, node_id: &str) -> bool {
        self.selected.contains(node_id)
    }

    pub fn select_all(&mut self) {
        self.selected = self.available.iter().map(|b| b.node_id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn selected_bins(&self) -> Vec<BinToCollect> {
        self.available
            .iter()
            .filter(|b| self.selected.contains(&b.node_id))
            .cloned()
            .collect()
    }

    /// The request for the current selection. An empty selection is a
    /// validation error.
    pub fn build_request(&self) -> Result<RouteRequest, ViewError> {
        let bins = self.selected_bins();
        if bins.is_empty() {
            return Err(ViewError::Validation(MSG_SELECT_AT_LEAST_ONE.to_string()));
        }
        Ok(RouteRequest {
            start_location: self.start,
            bins,
            max_stops: Some(self.max_stops),
            max_duration_hours: None,
        })
    }

    /// Ask the service for a route over the selected bins.
    ///
    /// On failure the previous route is kept and the error becomes the
    /// banner.
    pub async fn optimize(&mut self) -> Result<&OptimizedRoute, ViewError> {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.clone());
                return Err(e);
            }
        };
        self.error = None;

        match self.ai.optimize_route(&request).await {
            Ok(route) => {
                tracing::info!(
                    stops = route.sequence.len(),
                    distance_km = route.total_distance_km,
                    "Route optimized"
                );
                Ok(&*self.route.insert(route))
            }
            Err(e) => {
                let err = ViewError::from_api(&e, ROUTE_FAILED);
                tracing::warn!(error = %err, "Route optimization failed");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn route(&self) -> Option<&OptimizedRoute> {
        self.route.as_ref()
    }

    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}
