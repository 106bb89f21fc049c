use serde::{Deserialize, Serialize};
use std::fmt::Display;
use sweeplab_common::{Real, SampleIndex, SweepIndex};

/// A sample of a trace together with its position in the sweep.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexValue {
    pub index: SampleIndex,
    pub value: Real,
}

impl Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{0},{1}", self.index, self.value))
    }
}

impl IndexValue {
    /// The first occurrence of the largest value in `trace`, offset by `start`.
    pub(crate) fn first_max(trace: &[Real], start: SampleIndex) -> Option<Self> {
        Self::first_by(trace, start, |candidate, best| candidate > best)
    }

    /// The first occurrence of the smallest value in `trace`, offset by `start`.
    pub(crate) fn first_min(trace: &[Real], start: SampleIndex) -> Option<Self> {
        Self::first_by(trace, start, |candidate, best| candidate < best)
    }

    fn first_by(
        trace: &[Real],
        start: SampleIndex,
        replaces: impl Fn(Real, Real) -> bool,
    ) -> Option<Self> {
        trace
            .iter()
            .enumerate()
            .fold(None, |best: Option<Self>, (i, &value)| match best {
                Some(best) if !replaces(value, best.value) => Some(best),
                _ => Some(Self {
                    index: start + i,
                    value,
                }),
            })
    }
}

/// A half-open range of sample indices.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: SampleIndex,
    pub end: SampleIndex,
}

impl IndexRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: SampleIndex) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// One detected action potential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub sweep: SweepIndex,
    /// Sample index of the refined threshold crossing.
    pub onset: SampleIndex,
    /// Seconds from the start of the sweep.
    pub time_in_sweep: Real,
    /// Seconds from the start of the experiment.
    pub time: Real,
    pub onset_voltage: Real,

    /// From onset to the sample at which the derivative recovers above the recovery threshold.
    pub fast_phase: IndexRange,
    pub fast_duration_ms: Real,
    pub derivative_max: IndexValue,
    pub derivative_min: IndexValue,

    pub slow_phase: IndexRange,
    pub peak: IndexValue,
    pub trough: IndexValue,
    pub rise_time_ms: Real,
    pub fall_time_ms: Real,

    /// Midway between onset voltage and peak voltage.
    pub half_amplitude: Real,
    pub half_rise: Option<SampleIndex>,
    pub half_fall: Option<SampleIndex>,
    /// NaN unless both half-amplitude crossings were found.
    pub half_width_ms: Real,

    /// Midway between the trough and onset voltage.
    pub ahp_return: Real,
    /// First sample after the trough at or above `ahp_return`, within the slow phase.
    pub ahp_return_index: Option<SampleIndex>,
    /// Mean rate of recovery from the trough to `ahp_return`, in units per millisecond.
    /// NaN if the level is not regained within the slow phase.
    pub ahp_upslope: Real,

    /// Instantaneous frequency in Hz, NaN for the first spike of a sweep.
    pub frequency: Real,
}

impl Spike {
    pub fn height(&self) -> Real {
        self.peak.value - self.onset_voltage
    }

    /// Steepest depolarisation, in units per millisecond.
    pub fn upslope(&self) -> Real {
        self.derivative_max.value
    }

    /// Steepest repolarisation, in units per millisecond.
    pub fn downslope(&self) -> Real {
        self.derivative_min.value
    }

    /// Depth of the after-hyperpolarisation below the onset voltage.
    pub fn ahp(&self) -> Real {
        self.onset_voltage - self.trough.value
    }

    /// False when the trough precedes the peak.
    pub fn is_ordered(&self) -> bool {
        self.trough.index >= self.peak.index
    }

    /// Checks that every index lies in the window it was taken from.
    pub(crate) fn check_consistency(&self) -> Result<(), &'static str> {
        if self.fast_phase.start != self.onset || self.slow_phase.start != self.onset {
            return Err("phase windows must start at the onset");
        }
        if !self.fast_phase.contains(self.derivative_max.index)
            || !self.fast_phase.contains(self.derivative_min.index)
        {
            return Err("derivative extremes lie outside the fast phase");
        }
        if !self.slow_phase.contains(self.peak.index) || !self.slow_phase.contains(self.trough.index)
        {
            return Err("voltage extremes lie outside the slow phase");
        }
        if let (Some(rise), Some(fall)) = (self.half_rise, self.half_fall) {
            if rise >= fall {
                return Err("half-amplitude crossings are out of order");
            }
        }
        if let Some(ahp_return) = self.ahp_return_index {
            if ahp_return <= self.trough.index || !self.slow_phase.contains(ahp_return) {
                return Err("after-hyperpolarisation return lies outside the recovery");
            }
        }
        Ok(())
    }
}

impl Display for Spike {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{0},{1},{2},{3},{4},{5}",
            self.sweep, self.onset, self.time, self.peak, self.trough, self.half_width_ms
        ))
    }
}
