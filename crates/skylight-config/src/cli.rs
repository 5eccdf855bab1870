//! Command-line argument parsing for the sky demo.

use std::path::PathBuf;

use clap::Parser;

use crate::SkyConfig;

/// Skylight command-line arguments.
///
/// CLI values override settings loaded from `sky.ron`.
#[derive(Parser, Debug)]
#[command(name = "skylight", about = "Nishita sky-dome simulator")]
pub struct CliArgs {
    /// Sky quality (1 = every shell, 2 = every other shell).
    #[arg(long)]
    pub quality: Option<u32>,

    /// Percentage of the sky dome recomputed per frame.
    #[arg(long)]
    pub update_rate: Option<f32>,

    /// Optical lookup-table cache file.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Disable the lookup-table cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of simulated frames.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,
}

impl SkyConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(q) = args.quality {
            self.quality.sky_quality = q;
        }
        if let Some(rate) = args.update_rate {
            self.update.rate_percent_per_frame = rate;
        }
        if let Some(ref path) = args.cache {
            self.cache.path = path.clone();
        }
        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
