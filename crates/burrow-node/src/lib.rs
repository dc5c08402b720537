//! Burrow Node - Integration layer for the Burrow DHT
//!
//! Wires the routing and lookup engine to a transport behind a
//! single-threaded, event-driven session.

pub mod config;
pub mod session;

pub use config::Config;
pub use session::Session;
