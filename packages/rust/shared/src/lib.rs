//! Shared types, error model, and configuration for tallycheck.
//!
//! This crate is the foundation depended on by all other tallycheck crates.
//! It provides:
//! - [`TallycheckError`]: the unified error type
//! - Domain types ([`PathKey`], [`MetricLabel`], [`Counter`], [`TallyRecord`], [`Tier`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod counter;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExtractConfig, MergePolicy, RunConfig, TiersConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use counter::{Counter, TallyRecord};
pub use error::{Result, TallycheckError};
pub use types::{MetricLabel, PathKey, Tier};
