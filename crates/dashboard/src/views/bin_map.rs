//! Latest reading of every bin, as map markers and status counts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use binwatch_api::sensors::SensorRecord;
use binwatch_api::ApiClient;
use binwatch_core::geo::{center_of, Location, MapMarker};
use binwatch_core::sensor::{FillStatus, SensorReading};
use binwatch_core::types::Timestamp;
use chrono::Utc;

use super::lock;
use crate::error::ViewError;
use crate::poller::Poller;

/// Number of bins per fill status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinCounts {
    pub total: usize,
    pub full: usize,
    pub almost_full: usize,
    pub empty: usize,
}

impl BinCounts {
    pub fn from_records(records: &[SensorRecord]) -> Self {
        records.iter().fold(Self::default(), |mut counts, record| {
            counts.total += 1;
            match record.fill_status() {
                FillStatus::Full => counts.full += 1,
                FillStatus::AlmostFull => counts.almost_full += 1,
                FillStatus::Empty => counts.empty += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Default)]
struct MapState {
    bins: Vec<SensorRecord>,
    error: Option<ViewError>,
    updated_at: Option<Timestamp>,
}

/// Bin map view. Refreshed by polling `/sensor-data/latest` and patched by
/// live readings; the most recent write for a bin wins.
pub struct BinMap {
    api: ApiClient,
    fallback_center: Location,
    state: Mutex<MapState>,
}

impl BinMap {
    pub fn new(api: ApiClient, fallback_center: Location) -> Arc<Self> {
        Arc::new(Self {
            api,
            fallback_center,
            state: Mutex::new(MapState::default()),
        })
    }

    /// Fetch the latest snapshot. A failure keeps the previous bins and
    /// sets the error banner.
    pub async fn refresh(&self) -> Result<(), ViewError> {
        match self.api.sensors().latest().await {
            Ok(bins) => {
                tracing::debug!(bins = bins.len(), "Bin map refreshed");
                self.replace(bins);
                Ok(())
            }
            Err(e) => {
                let err = ViewError::from_api(&e, "Failed to load bin locations");
                lock(&self.state).error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Refresh every `every` until the returned poller is stopped.
    pub fn start_polling(self: &Arc<Self>, every: Duration) -> Poller {
        let map = Arc::clone(self);
        Poller::spawn("bin-map", every, move || {
            let map = Arc::clone(&map);
            async move { map.refresh().await }
        })
    }

    pub fn replace(&self, bins: Vec<SensorRecord>) {
        let mut state = lock(&self.state);
        state.bins = bins;
        state.error = None;
        state.updated_at = Some(Utc::now());
    }

    /// Patch the bin the reading came from. Returns `false` when the
    /// reading names no node or the node is not on the map yet.
    pub fn apply_reading(&self, reading: &SensorReading) -> bool {
        let Some(node) = reading.values.node.as_deref() else {
            return false;
        };
        let mut state = lock(&self.state);
        let Some(bin) = state.bins.iter_mut().find(|b| b.node_name == node) else {
            return false;
        };
        let values = &reading.values;
        if let Some(distance) = values.distance {
            bin.distance = distance;
        }
        if let Some(gas) = values.gas {
            bin.gas = gas;
        }
        if let (Some(lat), Some(lon)) = (values.latitude, values.longitude) {
            bin.latitude = lat;
            bin.longitude = lon;
        }
        bin.timestamp = reading.received_at.to_rfc3339();
        state.updated_at = Some(reading.received_at);
        true
    }

    pub fn bins(&self) -> Vec<SensorRecord> {
        lock(&self.state).bins.clone()
    }

    pub fn markers(&self) -> Vec<MapMarker> {
        lock(&self.state).bins.iter().map(SensorRecord::to_marker).collect()
    }

    pub fn counts(&self) -> BinCounts {
        BinCounts::from_records(&lock(&self.state).bins)
    }

    /// Centre of the known bins, or the configured centre when none are
    /// known.
    pub fn center(&self) -> Location {
        let markers = self.markers();
        if markers.is_empty() {
            self.fallback_center
        } else {
            center_of(&markers)
        }
    }

    pub fn error(&self) -> Option<ViewError> {
        lock(&self.state).error.clone()
    }

    pub fn dismiss_error(&self) {
        lock(&self.state).error = None;
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        lock(&self.state).updated_at
    }
}

#[cfg(test)]
mod tests {
    use binwatch_core::geo::MarkerStatus;
    use binwatch_core::token::StaticToken;
    use serde_json::json;

    use super::*;

    fn record(node: &str, distance: f64, lat: f64) -> SensorRecord {
        SensorRecord {
            id: format!("id-{node}"),
            node_name: node.into(),
            latitude: lat,
            longitude: 108.22,
            distance,
            gas: 100.0,
            timestamp: "2024-05-01T10:00:00".into(),
        }
    }

    fn map() -> Arc<BinMap> {
        let api = ApiClient::new("http://127.0.0.1:9/api", Arc::new(StaticToken::none())).unwrap();
        BinMap::new(api, Location::new(10.0, 106.0))
    }

    #[test]
    fn counts_by_fill_status() {
        let counts = BinCounts::from_records(&[
            record("a", 30.0, 16.0),
            record("b", 90.0, 16.0),
            record("c", 140.0, 16.0),
            record("d", 20.0, 16.0),
        ]);
        assert_eq!(
            counts,
            BinCounts {
                total: 4,
                full: 2,
                almost_full: 1,
                empty: 1
            }
        );
    }

    #[test]
    fn center_falls_back_when_empty() {
        let map = map();
        assert_eq!(map.center(), Location::new(10.0, 106.0));

        map.replace(vec![record("a", 30.0, 16.0), record("b", 30.0, 16.2)]);
        let center = map.center();
        assert!((center.lat - 16.1).abs() < 1e-9);
        assert_eq!(map.markers()[0].status, MarkerStatus::Critical);
    }

    #[test]
    fn live_reading_overwrites_polled_value() {
        let map = map();
        map.replace(vec![record("node1", 140.0, 16.0)]);
        assert_eq!(map.counts().empty, 1);

        let reading = SensorReading::from_payload(&json!({"node": "node1", "distance": 30.0}), Utc::now()).unwrap();
        assert!(map.apply_reading(&reading));
        assert_eq!(map.counts().full, 1);

        let stranger = SensorReading::from_payload(&json!({"node": "node9", "distance": 30.0}), Utc::now()).unwrap();
        assert!(!map.apply_reading(&stranger));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_bins_and_sets_banner() {
        let map = map();
        map.replace(vec![record("a", 30.0, 16.0)]);

        let err = map.refresh().await.unwrap_err();
        assert_eq!(err, ViewError::Fetch("Failed to load bin locations".into()));
        assert_eq!(map.bins().len(), 1);
        assert_eq!(map.error(), Some(err));

        map.dismiss_error();
        assert!(map.error().is_none());
    }
}
