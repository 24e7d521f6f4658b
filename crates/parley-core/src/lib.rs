//! Parley Core: configuration and observability shared by the Parley crates.
//!
//! - `config`: env-first configuration with `.env` support and alias chains
//! - `observability`: tracing subscriber setup
//! - `error`: startup configuration errors

pub mod config;
pub mod error;
pub mod observability;

pub use error::ConfigError;
