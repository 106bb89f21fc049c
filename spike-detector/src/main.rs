use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use spike_detector::{
    DetectionParameters, Diagnostic, Recording, RecordingSource, Spike, SpikeDetector,
    SummaryReference, SweepSummary,
};
use std::{fs::File, io::BufWriter, path::PathBuf};
use sweeplab_common::{Real, RecordingFile, SweepIndex, init_tracer, metrics::COUNTERS};
use tracing::{info, level_filters::LevelFilter, warn};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Recording to analyse, as written by sweep-simulator.
    #[clap(long)]
    input: PathBuf,

    /// If set, the detection report is written to this file as JSON.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Run the sweeps through detection in parallel.
    #[clap(long)]
    parallel: bool,

    /// Used when RUST_LOG is not set.
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the metrics snapshot on exit.
    #[clap(long)]
    print_metrics: bool,

    /// After full detection, re-detect this sweep only.
    #[clap(long)]
    re_detect: Option<SweepIndex>,

    /// Onset threshold used when re-detecting.
    #[clap(long, requires = "re_detect", allow_negative_numbers = true)]
    re_detect_onset_threshold: Option<Real>,

    #[command(flatten)]
    parameters: DetectionParameters,

    #[command(flatten)]
    reference: SummaryReference,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Report<'a> {
    parameters: &'a DetectionParameters,
    reference: &'a SummaryReference,
    summaries: Vec<SweepSummary>,
    spikes: Vec<Spike>,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(args.log_level)?;

    let handle = PrometheusBuilder::new().install_recorder()?;
    for (name, description) in COUNTERS {
        metrics::describe_counter!(name, metrics::Unit::Count, description);
    }

    let recording = Recording::try_from(RecordingFile::load(&args.input)?)?;
    info!(
        "loaded {} sweeps at {} Hz from {}",
        recording.sweep_count(),
        recording.sample_rate(),
        args.input.display()
    );

    let mut detector = SpikeDetector::new(recording, args.parameters.clone())?;
    if args.parallel {
        detector.detect_all_parallel()?;
    } else {
        detector.detect_all()?;
    }

    if let Some(sweep) = args.re_detect {
        if let Some(onset_threshold) = args.re_detect_onset_threshold {
            detector.set_parameters(DetectionParameters {
                onset_threshold,
                ..args.parameters.clone()
            })?;
        }
        detector.detect_sweep(sweep)?;
    }
    detector.info()?;

    let summaries = detector.summaries(&args.reference)?;
    for summary in &summaries {
        info!(
            sweep = summary.sweep,
            count = summary.count,
            freq_avg = summary.freq_avg,
            freq_cv = summary.freq_cv,
            ms_to_first = summary.ms_to_first,
            "sweep summary"
        );
    }

    let diagnostics = detector.diagnostics()?;
    if !diagnostics.is_empty() {
        warn!("{} diagnostics raised during detection", diagnostics.len());
    }

    if let Some(output) = &args.output {
        let report = Report {
            parameters: detector.parameters(),
            reference: &args.reference,
            summaries,
            spikes: detector.spikes()?,
            diagnostics,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(output)?), &report)?;
        info!("report written to {}", output.display());
    }

    if args.print_metrics {
        println!("{}", handle.render());
    }
    Ok(())
}
