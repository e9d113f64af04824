//! REST client for the BinWatch backend and the AI service.
//!
//! Every authenticated call carries `Authorization: Bearer <token>`. A
//! 401 from any endpoint surfaces as [`ApiError::Unauthorized`] so the
//! caller can send the user back to the login screen.

pub mod admin;
pub mod ai;
pub mod auth;
pub mod client;
pub mod error;
pub mod mqtt;
pub mod sensors;

pub use ai::AiClient;
pub use client::ApiClient;
pub use error::ApiError;
