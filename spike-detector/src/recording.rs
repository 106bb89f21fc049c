//! The recording collaborator: per-sweep voltage and derivative traces.
use crate::{DetectionError, DetectionResult};
use itertools::Itertools;
use std::iter;
use sweeplab_common::{MS_PER_SECOND, Real, RecordingFile, SampleRate, SweepIndex};

/// Borrowed traces of a single sweep. Both slices have the same length.
#[derive(Debug, Clone, Copy)]
pub struct SweepData<'a> {
    pub voltage: &'a [Real],
    /// Rate of change of `voltage`, in units per millisecond.
    pub derivative: &'a [Real],
}

impl SweepData<'_> {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}

/// A complete, already-acquired experiment.
pub trait RecordingSource: Sync {
    fn sweep_count(&self) -> usize;

    /// Samples per second.
    fn sample_rate(&self) -> SampleRate;

    /// Seconds between the start of consecutive sweeps.
    fn sweep_interval(&self) -> Real;

    fn sweep(&self, sweep: SweepIndex) -> DetectionResult<SweepData<'_>>;

    /// Seconds from the start of the experiment to the start of `sweep`.
    fn sweep_offset(&self, sweep: SweepIndex) -> Real {
        sweep as Real * self.sweep_interval()
    }

    fn points_per_sec(&self) -> Real {
        self.sample_rate()
    }

    fn points_per_ms(&self) -> Real {
        self.sample_rate() / MS_PER_SECOND
    }
}

#[derive(Debug, Clone)]
struct SweepTraces {
    voltage: Vec<Real>,
    derivative: Vec<Real>,
}

/// An in-memory [RecordingSource].
#[derive(Debug, Clone)]
pub struct Recording {
    sample_rate: SampleRate,
    sweep_interval: Real,
    sweeps: Vec<SweepTraces>,
}

/// First backward difference of `voltage`, scaled to units per millisecond.
/// The first sample has no predecessor and is given a derivative of zero.
pub fn derivative(voltage: &[Real], points_per_ms: Real) -> Vec<Real> {
    iter::once(Real::default())
        .take(voltage.len().min(1))
        .chain(
            voltage
                .iter()
                .tuple_windows()
                .map(|(prev, next)| (next - prev) * points_per_ms),
        )
        .collect()
}

impl Recording {
    /// Builds a recording from voltage sweeps, computing each derivative trace.
    pub fn from_voltages(
        sample_rate: SampleRate,
        sweep_interval: Real,
        sweeps: Vec<Vec<Real>>,
    ) -> DetectionResult<Self> {
        check_sample_rate(sample_rate)?;
        let points_per_ms = sample_rate / MS_PER_SECOND;
        let sweeps = sweeps
            .into_iter()
            .map(|voltage| SweepTraces {
                derivative: derivative(&voltage, points_per_ms),
                voltage,
            })
            .collect();
        Ok(Self {
            sample_rate,
            sweep_interval,
            sweeps,
        })
    }

    /// Builds a recording from `(voltage, derivative)` pairs.
    pub fn from_traces(
        sample_rate: SampleRate,
        sweep_interval: Real,
        sweeps: Vec<(Vec<Real>, Vec<Real>)>,
    ) -> DetectionResult<Self> {
        check_sample_rate(sample_rate)?;
        let sweeps = sweeps
            .into_iter()
            .enumerate()
            .map(|(sweep, (voltage, derivative))| {
                if voltage.len() == derivative.len() {
                    Ok(SweepTraces {
                        voltage,
                        derivative,
                    })
                } else {
                    Err(DetectionError::LengthMismatch {
                        sweep,
                        voltage: voltage.len(),
                        derivative: derivative.len(),
                    })
                }
            })
            .collect::<DetectionResult<_>>()?;
        Ok(Self {
            sample_rate,
            sweep_interval,
            sweeps,
        })
    }
}

fn check_sample_rate(sample_rate: SampleRate) -> DetectionResult<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(DetectionError::InvalidSampleRate(sample_rate))
    }
}

impl TryFrom<RecordingFile> for Recording {
    type Error = DetectionError;

    fn try_from(file: RecordingFile) -> Result<Self, Self::Error> {
        file.validate()?;
        Self::from_voltages(file.sample_rate, file.sweep_interval, file.sweeps)
    }
}

impl RecordingSource for Recording {
    fn sweep_count(&self) -> usize {
        self.sweeps.len()
    }

    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn sweep_interval(&self) -> Real {
        self.sweep_interval
    }

    fn sweep(&self, sweep: SweepIndex) -> DetectionResult<SweepData<'_>> {
        self.sweeps
            .get(sweep)
            .map(|traces| SweepData {
                voltage: &traces.voltage,
                derivative: &traces.derivative,
            })
            .ok_or(DetectionError::SweepOutOfRange {
                sweep,
                sweep_count: self.sweeps.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn derivative_is_scaled_backward_difference() {
        let voltage = [0.0, 1.0, 3.0, 2.0];
        let output = derivative(&voltage, 20.0);
        assert_eq!(output.len(), voltage.len());
        assert_approx_eq!(output[0], 0.0);
        assert_approx_eq!(output[1], 20.0);
        assert_approx_eq!(output[2], 40.0);
        assert_approx_eq!(output[3], -20.0);
    }

    #[test]
    fn derivative_of_empty_trace() {
        assert!(derivative(&[], 20.0).is_empty());
    }

    #[test]
    fn sweep_out_of_range() {
        let recording = Recording::from_voltages(20_000.0, 1.0, vec![vec![0.0; 8]]).unwrap();
        assert_eq!(recording.sweep_count(), 1);
        assert_eq!(recording.sweep(0).unwrap().len(), 8);
        assert!(matches!(
            recording.sweep(1),
            Err(DetectionError::SweepOutOfRange {
                sweep: 1,
                sweep_count: 1
            })
        ));
    }

    #[test]
    fn mismatched_traces_rejected() {
        let result = Recording::from_traces(20_000.0, 1.0, vec![(vec![0.0; 4], vec![0.0; 3])]);
        assert!(matches!(
            result,
            Err(DetectionError::LengthMismatch {
                sweep: 0,
                voltage: 4,
                derivative: 3
            })
        ));
    }

    #[test]
    fn timing_helpers() {
        let recording = Recording::from_voltages(20_000.0, 2.5, vec![vec![]; 3]).unwrap();
        assert_approx_eq!(recording.points_per_ms(), 20.0);
        assert_approx_eq!(recording.points_per_sec(), 20_000.0);
        assert_approx_eq!(recording.sweep_offset(2), 5.0);
    }

    #[test]
    fn from_recording_file() {
        let file = RecordingFile {
            sample_rate: 1000.0,
            sweep_interval: 1.0,
            sweeps: vec![vec![0.0, 2.0]],
        };
        let recording = Recording::try_from(file).unwrap();
        assert_approx_eq!(recording.sweep(0).unwrap().derivative[1], 2.0);
    }
}
