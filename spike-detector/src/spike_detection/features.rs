use super::{
    diagnostics::{Diagnostic, Diagnostics},
    window::SampleWindow,
};
use crate::{
    DetectionError, DetectionResult,
    error::Phase,
    parameters::WindowLengths,
    spike::{IndexRange, IndexValue, Spike},
};
use sweeplab_common::{Real, SampleIndex, SweepIndex};

/// Everything about a sweep the feature extractor needs, besides the onsets.
pub(crate) struct FeatureExtractor<'a> {
    pub(crate) sweep: SweepIndex,
    pub(crate) voltage: &'a [Real],
    pub(crate) derivative: &'a [Real],
    pub(crate) points_per_ms: Real,
    pub(crate) points_per_sec: Real,
    /// Seconds from the start of the experiment to the start of the sweep.
    pub(crate) sweep_offset: Real,
    pub(crate) recovery_threshold: Real,
    pub(crate) windows: WindowLengths,
}

impl FeatureExtractor<'_> {
    fn samples_to_ms(&self, samples: Real) -> Real {
        samples / self.points_per_ms
    }

    /// Brackets the fast transient: from onset, through the first dip to the
    /// recovery threshold, up to the sample at which the derivative recovers.
    fn fast_phase(
        &self,
        onset: SampleIndex,
        diagnostics: &mut Diagnostics,
    ) -> DetectionResult<IndexRange> {
        let fall = SampleWindow::forward(onset, self.windows.fast_fall, self.derivative.len());
        let fall_index = fall
            .slice(self.derivative)
            .iter()
            .position(|&value| value <= self.recovery_threshold)
            .map(|position| fall.start + position)
            .ok_or(DetectionError::NoRepolarisation {
                sweep: self.sweep,
                onset,
            })?;

        let recover = SampleWindow::forward(
            fall_index,
            self.windows.fast_recover,
            self.derivative.len(),
        );
        let end = match recover
            .slice(self.derivative)
            .iter()
            .position(|&value| value > self.recovery_threshold)
        {
            Some(position) => recover.start + position,
            None => {
                diagnostics.push(Diagnostic::FastPhaseTruncated {
                    sweep: self.sweep,
                    onset,
                    end: recover.end,
                });
                recover.end
            }
        };
        Ok(IndexRange { start: onset, end })
    }

    /// The slow phase is capped so that it never runs into the next spike.
    fn slow_phase(
        &self,
        onset: SampleIndex,
        next: Option<SampleIndex>,
        diagnostics: &mut Diagnostics,
    ) -> SampleWindow {
        let len = match next {
            Some(next) if next < onset + self.windows.slow => next.saturating_sub(onset),
            _ => self.windows.slow,
        };
        let window = SampleWindow::forward(onset, len, self.voltage.len());
        if window.truncated {
            diagnostics.push(Diagnostic::SlowPhaseTruncated {
                sweep: self.sweep,
                onset,
                end: window.end,
            });
        }
        window
    }

    /// Analyses the spike at `onset`, given the onsets of its neighbours in the sweep.
    pub(crate) fn extract(
        &self,
        onset: SampleIndex,
        previous: Option<SampleIndex>,
        next: Option<SampleIndex>,
        diagnostics: &mut Diagnostics,
    ) -> DetectionResult<Spike> {
        let empty_window = |phase| DetectionError::EmptyWindow {
            sweep: self.sweep,
            onset,
            phase,
        };
        let onset_voltage = *self.voltage.get(onset).ok_or(empty_window(Phase::Slow))?;

        let fast_phase = self.fast_phase(onset, diagnostics)?;
        let fast_trace = self
            .derivative
            .get(fast_phase.start..fast_phase.end)
            .unwrap_or_default();
        let derivative_max =
            IndexValue::first_max(fast_trace, onset).ok_or(empty_window(Phase::Fast))?;
        let derivative_min =
            IndexValue::first_min(fast_trace, onset).ok_or(empty_window(Phase::Fast))?;

        let slow = self.slow_phase(onset, next, diagnostics);
        let slow_trace = slow.slice(self.voltage);
        let peak = IndexValue::first_max(slow_trace, onset).ok_or(empty_window(Phase::Slow))?;
        let trough = IndexValue::first_min(slow_trace, onset).ok_or(empty_window(Phase::Slow))?;
        if trough.index < peak.index {
            diagnostics.push(Diagnostic::TroughBeforePeak {
                sweep: self.sweep,
                onset,
                peak: peak.index,
                trough: trough.index,
            });
        }

        let half_amplitude = (onset_voltage + peak.value) / 2.0;
        let (half_rise, half_fall) = half_amplitude_crossings(slow_trace, half_amplitude);
        let half_rise = half_rise.map(|i| onset + i);
        let half_fall = half_fall.map(|i| onset + i);
        let half_width_ms = match (half_rise, half_fall) {
            (Some(rise), Some(fall)) => self.samples_to_ms((fall - rise) as Real),
            _ => Real::NAN,
        };

        let ahp_return = (trough.value + onset_voltage) / 2.0;
        let ahp_return_index = ahp_return_crossing(slow_trace, trough.index - onset, ahp_return)
            .map(|i| onset + i);
        let ahp_upslope = ahp_return_index
            .map(|index| {
                (ahp_return - trough.value) / self.samples_to_ms((index - trough.index) as Real)
            })
            .unwrap_or(Real::NAN);

        let frequency = previous
            .filter(|&previous| previous < onset)
            .map(|previous| self.points_per_sec / (onset - previous) as Real)
            .unwrap_or(Real::NAN);

        let time_in_sweep = onset as Real / self.points_per_sec;
        let spike = Spike {
            sweep: self.sweep,
            onset,
            time_in_sweep,
            time: time_in_sweep + self.sweep_offset,
            onset_voltage,
            fast_phase,
            fast_duration_ms: self.samples_to_ms(fast_phase.len() as Real),
            derivative_max,
            derivative_min,
            slow_phase: slow.range(),
            peak,
            trough,
            rise_time_ms: self.samples_to_ms(peak.index as Real - onset as Real),
            fall_time_ms: self.samples_to_ms(trough.index as Real - peak.index as Real),
            half_amplitude,
            half_rise,
            half_fall,
            half_width_ms,
            ahp_return,
            ahp_return_index,
            ahp_upslope,
            frequency,
        };
        spike
            .check_consistency()
            .map_err(|reason| DetectionError::InconsistentSpike {
                sweep: self.sweep,
                onset,
                reason,
            })?;
        Ok(spike)
    }
}

/// Offsets into `trace` of the first rise above `level` and of the first
/// subsequent fall below it. Noise which recrosses the level before the
/// fall is ignored.
pub(crate) fn half_amplitude_crossings(
    trace: &[Real],
    level: Real,
) -> (Option<usize>, Option<usize>) {
    let rise = trace
        .iter()
        .enumerate()
        .position(|(i, &value)| {
            value > level && (i == 0 || trace.get(i - 1).is_some_and(|&prev| prev <= level))
        });
    let fall = rise.and_then(|rise| {
        trace
            .iter()
            .enumerate()
            .skip(rise + 1)
            .find(|(_, value)| **value < level)
            .map(|(i, _)| i)
    });
    (rise, fall)
}

/// Offset into `trace` of the first sample after `trough` at or above `level`.
pub(crate) fn ahp_return_crossing(trace: &[Real], trough: usize, level: Real) -> Option<usize> {
    trace
        .iter()
        .enumerate()
        .skip(trough + 1)
        .find(|(_, value)| **value >= level)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::DetectionParameters;
    use assert_approx_eq::assert_approx_eq;

    const POINTS_PER_MS: Real = 20.0;

    fn extractor<'a>(voltage: &'a [Real], derivative: &'a [Real]) -> FeatureExtractor<'a> {
        FeatureExtractor {
            sweep: 2,
            voltage,
            derivative,
            points_per_ms: POINTS_PER_MS,
            points_per_sec: POINTS_PER_MS * 1000.0,
            sweep_offset: 10.0,
            recovery_threshold: -10.0,
            windows: DetectionParameters::default()
                .window_lengths(POINTS_PER_MS)
                .unwrap(),
        }
    }

    /// A triangular bump from 0 to `peak` over `rise` samples and back over
    /// `fall` samples, starting at `onset`, followed by a shallow undershoot.
    fn triangle(len: usize, onset: usize, rise: usize, fall: usize, peak: Real) -> Vec<Real> {
        (0..len)
            .map(|i| {
                if i < onset {
                    0.0
                } else if i < onset + rise {
                    peak * (i - onset) as Real / rise as Real
                } else if i < onset + rise + fall {
                    peak * (onset + rise + fall - i) as Real / fall as Real
                } else if i < onset + rise + fall + 20 {
                    -5.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn derivative_of(voltage: &[Real]) -> Vec<Real> {
        crate::recording::derivative(voltage, POINTS_PER_MS)
    }

    #[test]
    fn triangular_bump_half_width() {
        let voltage = triangle(400, 100, 40, 40, 100.0);
        let derivative = derivative_of(&voltage);
        let mut diagnostics = Diagnostics::default();
        let spike = extractor(&voltage, &derivative)
            .extract(100, None, None, &mut diagnostics)
            .unwrap();

        assert_approx_eq!(spike.onset_voltage, 0.0);
        assert_approx_eq!(spike.half_amplitude, 50.0);
        assert_eq!(spike.peak.index, 140);
        assert_approx_eq!(spike.peak.value, 100.0);
        assert_approx_eq!(spike.half_width_ms, 2.0, 1.0 / POINTS_PER_MS);
        assert_approx_eq!(spike.rise_time_ms, 2.0);
        // trough of -5 at 180, back to 0 at 200
        assert_approx_eq!(spike.ahp_return, -2.5);
        assert_eq!(spike.ahp_return_index, Some(200));
        assert_approx_eq!(spike.ahp_upslope, 2.5);
        assert!(spike.is_ordered());
        assert!(diagnostics.into_inner().is_empty());
    }

    #[test]
    fn derivative_extremes_and_timing() {
        let voltage = triangle(400, 100, 40, 20, 100.0);
        let derivative = derivative_of(&voltage);
        let mut diagnostics = Diagnostics::default();
        let spike = extractor(&voltage, &derivative)
            .extract(100, Some(60), None, &mut diagnostics)
            .unwrap();

        // rise of 2.5 per sample at 20 samples per ms, steepest fall into the undershoot
        assert_approx_eq!(spike.upslope(), 50.0);
        assert_approx_eq!(spike.downslope(), -200.0);
        assert_eq!(spike.derivative_max.index, 101);
        assert_eq!(spike.derivative_min.index, 160);
        assert_eq!(spike.fast_phase.start, 100);
        assert_eq!(spike.fast_phase.end, 161);
        assert_approx_eq!(spike.fast_duration_ms, 61.0 / POINTS_PER_MS);
        assert_eq!(spike.trough.index, 160);
        assert_approx_eq!(spike.ahp(), 5.0);
        assert_approx_eq!(spike.height(), 100.0);
        assert_approx_eq!(spike.fall_time_ms, 1.0);
        assert_approx_eq!(spike.time_in_sweep, 0.005);
        assert_approx_eq!(spike.time, 10.005);
        assert_approx_eq!(spike.frequency, 500.0);
    }

    #[test]
    fn slow_phase_capped_by_next_spike() {
        let voltage = triangle(400, 100, 40, 40, 100.0);
        let derivative = derivative_of(&voltage);
        let mut diagnostics = Diagnostics::default();
        let spike = extractor(&voltage, &derivative)
            .extract(100, None, Some(150), &mut diagnostics)
            .unwrap();
        assert_eq!(spike.slow_phase, IndexRange { start: 100, end: 150 });
        // the trace has not returned to half amplitude by the next onset
        assert_eq!(spike.half_fall, None);
        assert!(spike.half_width_ms.is_nan());
        assert!(spike.frequency.is_nan());
    }

    #[test]
    fn trough_before_peak_is_reported() {
        let mut voltage = triangle(400, 100, 40, 40, 100.0);
        voltage[102] = -50.0;
        let derivative = derivative_of(&voltage);
        let mut diagnostics = Diagnostics::default();
        let spike = extractor(&voltage, &derivative)
            .extract(100, None, None, &mut diagnostics)
            .unwrap();
        assert!(!spike.is_ordered());
        assert_eq!(
            diagnostics.into_inner(),
            vec![Diagnostic::TroughBeforePeak {
                sweep: 2,
                onset: 100,
                peak: 140,
                trough: 102
            }]
        );
    }

    #[test]
    fn missing_repolarisation_is_fatal() {
        let voltage = vec![0.0; 50];
        let derivative = vec![0.0; 50];
        let mut diagnostics = Diagnostics::default();
        assert!(matches!(
            extractor(&voltage, &derivative).extract(10, None, None, &mut diagnostics),
            Err(DetectionError::NoRepolarisation {
                sweep: 2,
                onset: 10
            })
        ));
    }

    #[test]
    fn spike_at_sweep_end_is_truncated() {
        let voltage = triangle(160, 100, 40, 10, 100.0);
        let mut derivative = derivative_of(&voltage);
        // hold the derivative down to the end of the sweep
        derivative[150..].iter_mut().for_each(|d| *d = -50.0);
        let mut diagnostics = Diagnostics::default();
        let spike = extractor(&voltage, &derivative)
            .extract(100, None, None, &mut diagnostics)
            .unwrap();
        assert_eq!(spike.fast_phase.end, 160);
        assert_eq!(spike.slow_phase.end, 160);
        assert_eq!(
            diagnostics.into_inner(),
            vec![
                Diagnostic::FastPhaseTruncated {
                    sweep: 2,
                    onset: 100,
                    end: 160
                },
                Diagnostic::SlowPhaseTruncated {
                    sweep: 2,
                    onset: 100,
                    end: 160
                }
            ]
        );
    }

    #[test]
    fn ahp_not_regained_within_slow_phase() {
        let voltage = triangle(400, 100, 40, 40, 100.0);
        let derivative = derivative_of(&voltage);
        let mut diagnostics = Diagnostics::default();
        // the next spike cuts the slow phase off before the undershoot recovers
        let spike = extractor(&voltage, &derivative)
            .extract(100, None, Some(190), &mut diagnostics)
            .unwrap();
        assert_eq!(spike.trough.index, 180);
        assert_eq!(spike.ahp_return_index, None);
        assert!(spike.ahp_upslope.is_nan());
    }

    #[test]
    fn ahp_return_crossing_after_trough() {
        let trace = [0.0, -1.0, -4.0, -3.0, -1.5, 0.0];
        assert_eq!(ahp_return_crossing(&trace, 2, -2.0), Some(4));
        assert_eq!(ahp_return_crossing(&trace, 2, 1.0), None);
        assert_eq!(ahp_return_crossing(&trace, 5, -2.0), None);
    }

    #[test]
    fn half_amplitude_crossings_ignore_recrossings() {
        let trace = [0.0, 60.0, 40.0, 70.0, 40.0, 0.0];
        assert_eq!(half_amplitude_crossings(&trace, 50.0), (Some(1), Some(2)));
        let trace = [0.0, 10.0, 20.0];
        assert_eq!(half_amplitude_crossings(&trace, 50.0), (None, None));
        let trace = [0.0, 60.0, 70.0];
        assert_eq!(half_amplitude_crossings(&trace, 50.0), (Some(1), None));
    }
}
