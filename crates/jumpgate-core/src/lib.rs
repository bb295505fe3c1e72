//! `Jumpgate` Core Library
//!
//! Shared functionality for `Jumpgate` components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and storage errors
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
