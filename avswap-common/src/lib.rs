//! # avswap Common Library
//!
//! Shared code for the avswap audio substitution engine:
//! - Error type and `Result` alias
//! - TOML bootstrap configuration
//! - Tracing initialisation
//! - Engine event types and the `EventBus`
//! - SQLite schema initialisation for the track store

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EngineEvent, EventBus};
