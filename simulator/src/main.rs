mod action_potential;
mod error;
mod json;
mod noise;
mod sweep;

use anyhow::Result;
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use std::{fs::File, io::BufReader, path::PathBuf};
use sweeplab_common::init_tracer;
use tracing::{info, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON description of the sweeps to simulate.
    #[clap(long)]
    config: PathBuf,

    /// Recording file to write.
    #[clap(long)]
    output: PathBuf,

    /// Seed for the random number generator, drawn from the OS if not given.
    #[clap(long)]
    seed: Option<u64>,

    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(args.log_level)?;

    let simulation: json::Simulation =
        serde_json::from_reader(BufReader::new(File::open(&args.config)?))?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let recording = sweep::run_simulation(&simulation, &mut rng)?;
    recording.save(&args.output)?;
    info!("recording written to {}", args.output.display());
    Ok(())
}
