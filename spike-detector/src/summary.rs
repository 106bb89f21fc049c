//! Per-sweep firing statistics, derived on demand from stored spikes.
use crate::Spike;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use sweeplab_common::{MS_PER_SECOND, Real, SweepIndex};

/// Number of leading frequencies averaged for the early firing rate.
const EARLY_FREQUENCIES: usize = 5;

/// The command step of a sweep, in seconds from the start of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandWindow {
    pub start: Real,
    pub end: Real,
}

impl CommandWindow {
    pub fn duration(&self) -> Real {
        self.end - self.start
    }

    pub fn contains(&self, time: Real) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

/// Where in the sweep timing statistics are measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Args, Serialize, Deserialize)]
pub struct SummaryReference {
    /// Time-to-first-spike is measured from here, in seconds from the start of the sweep.
    #[clap(long = "step-start", default_value_t = 0.0)]
    pub reference_time: Real,

    /// End of the command step, in seconds from the start of the sweep.
    #[clap(long = "step-end")]
    pub step_end: Option<Real>,
}

impl SummaryReference {
    pub fn command_window(&self) -> Option<CommandWindow> {
        self.step_end.map(|end| CommandWindow {
            start: self.reference_time,
            end,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub sweep: SweepIndex,
    pub count: usize,
    /// Instantaneous frequency of each spike in onset order, the first is always NaN.
    pub frequencies: Vec<Real>,
    pub freq_avg: Real,
    pub freq_median: Real,
    pub freq_first: Real,
    pub freq_first5: Real,
    pub freq_last: Real,
    pub freq_steady25: Real,
    pub freq_cv: Real,
    pub accom1_avg: Real,
    pub accom1_steady25: Real,
    pub accom5_avg: Real,
    pub accom5_steady25: Real,
    pub ms_to_first: Real,
    /// Mean spike time, in seconds from the start of the sweep.
    pub centroid_time: Real,
    /// Position of the centroid between the first (0) and last (1) spike.
    pub centroid_fraction: Real,
    /// Spikes within the command step per second of step.
    pub binned_frequency: Real,
    /// Position of the centroid of in-step spikes between step start (0) and end (1).
    pub step_centroid_fraction: Real,
}

pub(crate) fn mean(values: &[Real]) -> Real {
    if values.is_empty() {
        Real::NAN
    } else {
        values.iter().sum::<Real>() / values.len() as Real
    }
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[Real]) -> Real {
    let mean = mean(values);
    mean_of(values.iter().map(|v| (v - mean).powi(2))).sqrt()
}

fn mean_of(values: impl Iterator<Item = Real>) -> Real {
    mean(&values.collect::<Vec<_>>())
}

pub(crate) fn median(values: &[Real]) -> Real {
    let mut sorted = values.to_vec();
    sorted.sort_by(Real::total_cmp);
    let mid = sorted.len() / 2;
    match (sorted.len() % 2, sorted.get(mid)) {
        (_, None) => Real::NAN,
        (1, Some(&value)) => value,
        (_, Some(&upper)) => mid
            .checked_sub(1)
            .and_then(|lower| sorted.get(lower))
            .map(|&lower| (lower + upper) / 2.0)
            .unwrap_or(Real::NAN),
    }
}

/// Mean ignoring NaN values, NaN if no value is defined.
pub(crate) fn nan_mean(values: &[Real]) -> Real {
    mean(&defined(values))
}

/// Median ignoring NaN values, NaN if no value is defined.
pub(crate) fn nan_median(values: &[Real]) -> Real {
    median(&defined(values))
}

fn defined(values: &[Real]) -> Vec<Real> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Where `value` lies between `from` (0) and `to` (1).
fn fraction(value: Real, from: Real, to: Real) -> Real {
    match (to - from).partial_cmp(&0.0) {
        Some(Ordering::Greater) => (value - from) / (to - from),
        _ => Real::NAN,
    }
}

impl SweepSummary {
    /// Summarises the spikes of `sweep`. Spikes are taken in onset order.
    pub fn from_spikes<'a>(
        sweep: SweepIndex,
        spikes: impl IntoIterator<Item = &'a Spike>,
        reference: &SummaryReference,
    ) -> Self {
        let mut spikes: Vec<&Spike> = spikes.into_iter().collect();
        spikes.sort_by_key(|spike| spike.onset);

        let frequencies: Vec<Real> = spikes.iter().map(|spike| spike.frequency).collect();
        let freqs = defined(&frequencies);

        let freq_avg = mean(&freqs);
        let freq_first = freqs.first().copied().unwrap_or(Real::NAN);
        let freq_first5 = mean(freqs.get(..EARLY_FREQUENCIES).unwrap_or(freqs.as_slice()));
        let freq_last = freqs.last().copied().unwrap_or(Real::NAN);
        let quartile = freqs.len().div_ceil(4);
        let freq_steady25 = mean(freqs.get(freqs.len() - quartile..).unwrap_or_default());

        let times: Vec<Real> = spikes.iter().map(|spike| spike.time_in_sweep).collect();
        let centroid_time = mean(&times);
        let centroid_fraction = match (times.first(), times.last()) {
            (Some(&first), Some(&last)) if times.len() > 1 => fraction(centroid_time, first, last),
            _ => Real::NAN,
        };
        let ms_to_first = times
            .first()
            .map(|first| (first - reference.reference_time) * MS_PER_SECOND)
            .unwrap_or(Real::NAN);

        let (binned_frequency, step_centroid_fraction) = match reference.command_window() {
            Some(window) if window.duration() > 0.0 => {
                let in_step: Vec<Real> = times
                    .iter()
                    .copied()
                    .filter(|&time| window.contains(time))
                    .collect();
                (
                    in_step.len() as Real / window.duration(),
                    fraction(mean(&in_step), window.start, window.end),
                )
            }
            _ => (Real::NAN, Real::NAN),
        };

        Self {
            sweep,
            count: spikes.len(),
            freq_median: median(&freqs),
            freq_cv: std_dev(&freqs) / freq_avg,
            accom1_avg: freq_first / freq_avg,
            accom1_steady25: freq_first / freq_steady25,
            accom5_avg: freq_first5 / freq_avg,
            accom5_steady25: freq_first5 / freq_steady25,
            frequencies,
            freq_avg,
            freq_first,
            freq_first5,
            freq_last,
            freq_steady25,
            ms_to_first,
            centroid_time,
            centroid_fraction,
            binned_frequency,
            step_centroid_fraction,
        }
    }
}
