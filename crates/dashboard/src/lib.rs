//! Orchestration for the BinWatch dashboard.
//!
//! Wires the session store, the live channel and the REST clients into
//! login/logout flows, a session-bound channel supervisor, polling tasks,
//! screen routing and headless view-models. The `binwatch` binary is a thin
//! terminal front end over this crate.

pub mod auth_flow;
pub mod config;
pub mod error;
pub mod nav;
pub mod poller;
pub mod supervisor;
pub mod views;

pub use auth_flow::{AuthBackend, AuthFlow};
pub use config::DashboardConfig;
pub use error::ViewError;
pub use nav::{Navigator, Screen};
pub use poller::Poller;
pub use supervisor::{ChannelSettings, ChannelSupervisor};
