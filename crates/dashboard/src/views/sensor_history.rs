//! Recent readings across all bins, refetched from `/sensor-data/history`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use binwatch_api::sensors::SensorRecord;
use binwatch_api::ApiClient;
use binwatch_core::sensor::FillStatus;
use binwatch_core::types::Timestamp;
use chrono::Utc;

use super::lock;
use crate::error::ViewError;
use crate::poller::Poller;

/// One table row: the stored reading plus its derived fill level.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub node_name: String,
    pub timestamp: String,
    pub distance: f64,
    pub gas: f64,
    pub fill_level: u8,
    pub status: FillStatus,
}

impl From<&SensorRecord> for HistoryRow {
    fn from(record: &SensorRecord) -> Self {
        Self {
            node_name: record.node_name.clone(),
            timestamp: record.timestamp.clone(),
            distance: record.distance,
            gas: record.gas,
            fill_level: record.fill_level(),
            status: record.fill_status(),
        }
    }
}

/// Totals shown above the table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistorySummary {
    pub records: usize,
    /// Rounded mean fill level, 0 when there are no records.
    pub average_fill: u8,
    /// Rounded mean gas reading, 0 when there are no records.
    pub average_gas: f64,
}

impl HistorySummary {
    pub fn from_rows(rows: &[HistoryRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let n = rows.len() as f64;
        let fill: f64 = rows.iter().map(|r| f64::from(r.fill_level)).sum();
        let gas: f64 = rows.iter().map(|r| r.gas).sum();
        Self {
            records: rows.len(),
            average_fill: (fill / n).round() as u8,
            average_gas: (gas / n).round(),
        }
    }
}

#[derive(Debug, Default)]
struct HistoryState {
    rows: Vec<HistoryRow>,
    error: Option<ViewError>,
    updated_at: Option<Timestamp>,
}

/// Sensor data table.
pub struct SensorHistory {
    api: ApiClient,
    state: Mutex<HistoryState>,
}

impl SensorHistory {
    pub fn new(api: ApiClient) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: Mutex::new(HistoryState::default()),
        })
    }

    /// Refetch the table. A failure keeps the previous rows.
    pub async fn refresh(&self) -> Result<(), ViewError> {
        match self.api.sensors().history().await {
            Ok(records) => {
                let rows: Vec<HistoryRow> = records.iter().map(HistoryRow::from).collect();
                tracing::debug!(rows = rows.len(), "Sensor history refreshed");
                let mut state = lock(&self.state);
                state.rows = rows;
                state.error = None;
                state.updated_at = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                let err = ViewError::from_api(&e, "Failed to load sensor data");
                lock(&self.state).error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn start_polling(self: &Arc<Self>, every: Duration) -> Poller {
        let view = Arc::clone(self);
        Poller::spawn("sensor-history", every, move || {
            let view = Arc::clone(&view);
            async move { view.refresh().await }
        })
    }

    pub fn rows(&self) -> Vec<HistoryRow> {
        lock(&self.state).rows.clone()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary::from_rows(&lock(&self.state).rows)
    }

    pub fn error(&self) -> Option<ViewError> {
        lock(&self.state).error.clone()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        lock(&self.state).updated_at
    }
}
