//! `remotedial` Core Library
//!
//! Shared functionality for `remotedial` components:
//! - Configuration resolution (settings file + environment)
//! - Tracing subscriber setup
//! - Common error types

pub mod config;
pub mod error;
pub mod tracing_init;

pub use config::{ClientConfig, Config, TransportConfig};
pub use error::{Error, Result};
