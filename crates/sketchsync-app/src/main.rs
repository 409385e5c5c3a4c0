//! SketchSync client entry point.

use clap::Parser;
use sketchsync_app::{Args, run};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting SketchSync");

    run(Args::parse())
}
