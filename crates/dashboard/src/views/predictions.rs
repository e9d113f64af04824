//! Per-bin fullness predictions from the AI service.

use std::collections::HashMap;

use binwatch_api::ai::{BinToCollect, Prediction, PredictionRequest, DEFAULT_FILL_RATE_MM_PER_HOUR};
use binwatch_api::sensors::SensorRecord;
use binwatch_api::AiClient;
use binwatch_core::geo::Location;
use binwatch_core::types::NodeId;
use binwatch_core::urgency::{format_hours_until_full, Urgency, UrgencyBadge};
use futures::future::join_all;

/// Bin depth the AI service measures trash levels against.
pub const BIN_HEIGHT_MM: f64 = 300.0;

/// A bin and, once fetched, its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub name: String,
    pub location: Location,
    pub fill_percentage: f64,
    pub trash_level_mm: f64,
    pub prediction: Option<Prediction>,
}

impl NodeStatus {
    pub fn new(node_id: impl Into<NodeId>, name: impl Into<String>, location: Location, fill_percentage: f64) -> Self {
        let fill_percentage = fill_percentage.clamp(0.0, 100.0);
        Self {
            node_id: node_id.into(),
            name: name.into(),
            location,
            fill_percentage,
            trash_level_mm: fill_percentage / 100.0 * BIN_HEIGHT_MM,
            prediction: None,
        }
    }

    pub fn from_record(record: &SensorRecord) -> Self {
        let id = if record.node_name.is_empty() {
            &record.id
        } else {
            &record.node_name
        };
        Self::new(id.clone(), id.clone(), record.location(), f64::from(record.fill_level()))
    }

    pub fn request(&self) -> PredictionRequest {
        PredictionRequest {
            node_id: self.node_id.clone(),
            current_level_mm: self.trash_level_mm,
            fill_percentage: self.fill_percentage,
            historical_fill_rate: Some(DEFAULT_FILL_RATE_MM_PER_HOUR),
        }
    }

    /// Urgency reported by the service, if a prediction is present.
    pub fn urgency(&self) -> Option<Urgency> {
        self.prediction.as_ref().map(Prediction::urgency_level)
    }

    /// Urgency for display and routing. Without a prediction the fill
    /// level alone decides.
    pub fn effective_urgency(&self) -> Urgency {
        self.urgency()
            .unwrap_or_else(|| Urgency::classify(self.fill_percentage, f64::INFINITY))
    }

    pub fn badge(&self) -> Option<UrgencyBadge> {
        self.urgency().map(Urgency::badge)
    }

    /// e.g. "3 h", or `None` before a prediction arrives.
    pub fn time_until_full(&self) -> Option<String> {
        self.prediction
            .as_ref()
            .map(|p| format_hours_until_full(p.hours_until_full))
    }

    pub fn to_route_bin(&self) -> BinToCollect {
        BinToCollect {
            node_id: self.node_id.clone(),
            location: self.location,
            fill_percentage: self.fill_percentage,
            urgency: self.effective_urgency(),
            predicted_full_hours: self.prediction.as_ref().map(|p| p.hours_until_full),
        }
    }
}

/// Nodes per urgency. `pending` counts nodes without a prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrgencyCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub pending: usize,
}

/// The AI dashboard.
pub struct PredictionBoard {
    ai: AiClient,
    nodes: Vec<NodeStatus>,
}

impl PredictionBoard {
    pub fn new(ai: AiClient) -> Self {
        Self { ai, nodes: Vec::new() }
    }

    /// Replace the node list. Predictions already fetched for a node that
    /// is still present are kept until the next refresh.
    pub fn set_nodes(&mut self, nodes: Vec<NodeStatus>) {
        let mut previous: HashMap<NodeId, Prediction> = self
            .nodes
            .drain(..)
            .filter_map(|n| n.prediction.map(|p| (n.node_id, p)))
            .collect();
        self.nodes = nodes
            .into_iter()
            .map(|mut node| {
                if node.prediction.is_none() {
                    node.prediction = previous.remove(&node.node_id);
                }
                node
            })
            .collect();
    }

    pub fn nodes(&self) -> &[NodeStatus] {
        &self.nodes
    }

    /// Ask for a prediction for every node concurrently.
    ///
    /// A node whose request fails is left without a prediction; the others
    /// are unaffected. Returns how many predictions arrived.
    pub async fn refresh(&mut self) -> usize {
        let ai = &self.ai;
        let results = join_all(self.nodes.iter().map(|node| {
            let request = node.request();
            async move { ai.predict_fullness(&request).await }
        }))
        .await;

        let mut received = 0;
        for (node, result) in self.nodes.iter_mut().zip(results) {
            match result {
                Ok(prediction) => {
                    received += 1;
                    node.prediction = Some(prediction);
                }
                Err(e) => {
                    tracing::warn!(node_id = %node.node_id, error = %e, "Prediction failed");
                    node.prediction = None;
                }
            }
        }
        tracing::debug!(received, total = self.nodes.len(), "Predictions refreshed");
        received
    }

    pub fn counts(&self) -> UrgencyCounts {
        self.nodes.iter().fold(UrgencyCounts::default(), |mut counts, node| {
            match node.urgency() {
                Some(Urgency::Critical) => counts.critical += 1,
                Some(Urgency::High) => counts.high += 1,
                Some(Urgency::Medium) => counts.medium += 1,
                Some(Urgency::Low) => counts.low += 1,
                None => counts.pending += 1,
            }
            counts
        })
    }

    /// Nodes ordered most urgent first, fuller bins first within a level.
    pub fn by_urgency(&self) -> Vec<&NodeStatus> {
        let mut nodes: Vec<&NodeStatus> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| {
            a.effective_urgency()
                .priority()
                .cmp(&b.effective_urgency().priority())
                .then(b.fill_percentage.total_cmp(&a.fill_percentage))
        });
        nodes
    }

    /// Bins to hand to the route optimizer.
    pub fn route_candidates(&self) -> Vec<BinToCollect> {
        self.by_urgency().into_iter().map(NodeStatus::to_route_bin).collect()
    }
}
