//! Headless view-models.
//!
//! Each view owns the derived state one dashboard screen renders. Views
//! that are fed from callbacks (live handlers, pollers) keep that state
//! behind a mutex so the callback and the renderer can share it.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod bin_map;
pub mod devices;
pub mod predictions;
pub mod route_optimizer;
pub mod sensor_feed;
pub mod sensor_history;
pub mod users;

pub use bin_map::{BinCounts, BinMap};
pub use devices::DeviceManager;
pub use predictions::{NodeStatus, PredictionBoard, UrgencyCounts};
pub use route_optimizer::RouteOptimizer;
pub use sensor_feed::SensorFeed;
pub use sensor_history::{HistoryRow, HistorySummary, SensorHistory};
pub use users::UserManager;

/// Handlers never leave state half-written, so a poisoned lock is safe to
/// reuse.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
