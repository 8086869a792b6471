//! Memts Common - Shared Types and Utilities
//!
//! Foundational error and configuration types used by the memts time
//! series engine.
//!
//! Key Features:
//! - Unified error type with user vs system classification
//! - Database and aggregation configuration, loadable from TOML
//!
//! @version 0.1.0
//! @author Memts Development Team

pub mod config;
pub mod error;

pub use config::{AggregateConfig, DatabaseConfig, MissingFieldPolicy};
pub use error::{MemtsError, Result};
