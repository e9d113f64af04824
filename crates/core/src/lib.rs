//! Domain types and pure logic for the BinWatch trash-bin monitoring client.
//!
//! Nothing in this crate performs I/O. The session, live-channel, REST and
//! dashboard crates all build on these types.

pub mod auth;
pub mod error;
pub mod geo;
pub mod history;
pub mod sensor;
pub mod token;
pub mod types;
pub mod urgency;
pub mod validation;
