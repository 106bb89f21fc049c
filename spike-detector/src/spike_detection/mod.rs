//! Spike detection within a single sweep.
//!
//! Detection runs in four stages over the derivative trace:
//! ```text
//! rising_crossings    candidates where dV/dt first exceeds the onset threshold
//!  -> repolarising    drop candidates which do not dip to the recovery threshold
//!  -> refine_onsets   walk each onset back to the start of its rise
//!  -> extract         measure each spike from the voltage and derivative traces
//! ```
pub(crate) mod backtrack;
pub(crate) mod crossings;
pub mod diagnostics;
pub(crate) mod features;
pub(crate) mod window;

use crate::{
    DetectionError, DetectionParameters, DetectionResult, RecordingSource, Spike,
};
use diagnostics::{Diagnostic, Diagnostics};
use features::FeatureExtractor;
use metrics::counter;
use sweeplab_common::{
    SweepIndex,
    metrics::metric_names::{SPIKES_DETECTED, SWEEPS_PROCESSED},
};
use tracing::debug;

/// The outcome of running detection over one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepDetection {
    pub sweep: SweepIndex,
    /// In strictly increasing order of onset.
    pub spikes: Vec<Spike>,
    pub diagnostics: Vec<Diagnostic>,
}

#[tracing::instrument(skip_all, fields(sweep = sweep, num_candidates, num_spikes))]
pub fn detect_sweep_spikes<S: RecordingSource + ?Sized>(
    source: &S,
    sweep: SweepIndex,
    parameters: &DetectionParameters,
) -> DetectionResult<SweepDetection> {
    let data = source.sweep(sweep)?;
    if data.voltage.len() != data.derivative.len() {
        return Err(DetectionError::LengthMismatch {
            sweep,
            voltage: data.voltage.len(),
            derivative: data.derivative.len(),
        });
    }
    let windows = parameters.window_lengths(source.points_per_ms())?;
    let mut diagnostics = Diagnostics::default();

    let candidates = crossings::rising_crossings(data.derivative, parameters.onset_threshold);
    tracing::Span::current().record("num_candidates", candidates.len());
    debug!("initial spike detection: {} candidates", candidates.len());

    let candidates = crossings::repolarising(
        &candidates,
        data.derivative,
        parameters.recovery_threshold,
        windows.validity,
    );
    debug!("after recovery threshold checking: {} candidates", candidates.len());

    let onsets = backtrack::refine_onsets(
        sweep,
        &candidates,
        data.derivative,
        parameters.backtrack_threshold,
        windows.backtrack,
        &mut diagnostics,
    );

    let extractor = FeatureExtractor {
        sweep,
        voltage: data.voltage,
        derivative: data.derivative,
        points_per_ms: source.points_per_ms(),
        points_per_sec: source.points_per_sec(),
        sweep_offset: source.sweep_offset(sweep),
        recovery_threshold: parameters.recovery_threshold,
        windows,
    };
    let spikes = onsets
        .iter()
        .enumerate()
        .map(|(i, &onset)| {
            let previous = i.checked_sub(1).and_then(|p| onsets.get(p)).copied();
            let next = onsets.get(i + 1).copied();
            extractor.extract(onset, previous, next, &mut diagnostics)
        })
        .collect::<DetectionResult<Vec<_>>>()?;

    tracing::Span::current().record("num_spikes", spikes.len());
    debug!("finished analysing sweep. Found {} spikes", spikes.len());
    counter!(SWEEPS_PROCESSED).increment(1);
    counter!(SPIKES_DETECTED).increment(spikes.len() as u64);

    Ok(SweepDetection {
        sweep,
        spikes,
        diagnostics: diagnostics.into_inner(),
    })
}
