//! Database schema management for the persistent track store

pub mod init;

pub use init::{init_database, init_memory_database};
