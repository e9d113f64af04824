//! `/sensor-data` endpoints.

use binwatch_core::geo::{Location, MapMarker};
use binwatch_core::sensor::{fill_level_from_distance, FillStatus};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;

/// One stored reading from a bin.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub id: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Lid-to-rubbish distance in millimetres.
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub gas: f64,
    #[serde(default)]
    pub timestamp: String,
}

impl SensorRecord {
    pub fn fill_level(&self) -> u8 {
        fill_level_from_distance(self.distance)
    }

    pub fn fill_status(&self) -> FillStatus {
        FillStatus::from_fill_level(self.fill_level())
    }

    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }

    /// Map marker for this bin, labelled with its node name.
    pub fn to_marker(&self) -> MapMarker {
        let label = if self.node_name.is_empty() {
            self.id.clone()
        } else {
            self.node_name.clone()
        };
        MapMarker::new(self.id.clone(), label, self.location(), self.fill_level())
    }
}

/// `{ "data": [...] }` envelope used by the sensor endpoints.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

pub struct SensorApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SensorApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Latest reading of every bin.
    pub async fn latest(&self) -> Result<Vec<SensorRecord>, ApiError> {
        let envelope: DataEnvelope<SensorRecord> = self.client.get_json("/sensor-data/latest").await?;
        Ok(envelope.data)
    }

    /// Most recent readings across all bins, newest first.
    pub async fn history(&self) -> Result<Vec<SensorRecord>, ApiError> {
        let envelope: DataEnvelope<SensorRecord> = self.client.get_json("/sensor-data/history").await?;
        Ok(envelope.data)
    }
}
