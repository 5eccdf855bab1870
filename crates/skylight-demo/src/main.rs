//! Headless sky demo: simulates a day of incremental sky-dome updates.
//!
//! Configuration is loaded from `sky.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p skylight-demo -- --frames 2000 --update-rate 1.5`.

mod day_cycle;
mod setup;

use clap::Parser;
use skylight_config::{CliArgs, SkyConfig, default_config_dir};
use skylight_dome::{InlineExecutor, JobExecutor, SkyScheduler, WorkerExecutor};
use tracing::info;

use crate::day_cycle::TimeOfDay;

/// Frames between progress reports.
const REPORT_INTERVAL: u32 = 120;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let mut config = SkyConfig::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        SkyConfig::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    skylight_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        "Skylight demo: quality {}, {}% of the dome per frame, {} frames",
        config.quality.clamped_quality(),
        config.update.effective_rate(),
        args.frames
    );

    let model = setup::build_model(&config, &config_dir);

    if config.update.worker_thread {
        match WorkerExecutor::new() {
            Ok(executor) => return run(SkyScheduler::new(model, executor), &config, args.frames),
            Err(e) => tracing::warn!("Could not spawn sky worker ({e}); running inline"),
        }
    }
    run(SkyScheduler::new(model, InlineExecutor::new()), &config, args.frames);
}

fn run<E: JobExecutor>(mut sky: SkyScheduler<E>, config: &SkyConfig, frames: u32) {
    let rate = config.update.effective_rate();
    let base = setup::condition_from_config(&config.atmosphere);

    // Start from a complete dome so the first frames have something to show.
    sky.set_sky_light_parameters(base, true);
    sky.sync();

    let mut time = TimeOfDay::new(6.0, 24.0 / frames.max(1) as f32);
    for frame in 0..frames {
        time.advance();
        let mut condition = sky.sky_dome_condition();
        condition.sun_direction = time.sun_direction();
        sky.set_sky_dome_condition(condition);

        sky.incremental_update(rate, frame as u64);

        if frame % REPORT_INTERVAL == 0 {
            let params = sky.render_params();
            let c = params.constants;
            info!(
                "frame {frame:5} {:05.2}h  dome #{:<3} haze {:.4?} top {:.4?}",
                time.hours,
                params.texture_timestamp,
                c.haze_color.truncate().to_array(),
                c.sky_color_top.to_array()
            );
        }
    }

    sky.sync();
    let (timestamp, c) = {
        let params = sky.render_params();
        (params.texture_timestamp, params.constants)
    };
    info!(
        "Finished after {timestamp} domes; front buffer {:?}",
        sky.front_index()
    );
    info!(
        "hemisphere top {:.4?} north {:.4?} east {:.4?} south {:.4?} west {:.4?}",
        c.sky_color_top.to_array(),
        c.sky_color_north.to_array(),
        c.sky_color_east.to_array(),
        c.sky_color_south.to_array(),
        c.sky_color_west.to_array()
    );
    info!("Sky memory: {} KiB", sky.memory_usage() / 1024);
}
