//! Configuration system for the Skylight sky model.
//!
//! Provides runtime-configurable atmosphere, quality, update-rate and cache
//! settings that persist to disk as RON files. Supports CLI overrides via clap,
//! hot-reload detection, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AtmosphereConfig, CacheConfig, DebugConfig, QualityConfig, SkyConfig, UpdateConfig,
    default_config_dir,
};
pub use error::ConfigError;
