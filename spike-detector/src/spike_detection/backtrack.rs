use super::{
    diagnostics::{Diagnostic, Diagnostics},
    window::SampleWindow,
};
use sweeplab_common::{Real, SampleIndex, SweepIndex};

/// Walks back from `candidate` to the first sample of the run in which the
/// derivative stays above `threshold`, looking no further than `window_len`
/// samples. Returns `None` when the run extends past the window (or the
/// start of the sweep).
pub(crate) fn backtrack_onset(
    candidate: SampleIndex,
    derivative: &[Real],
    threshold: Real,
    window_len: usize,
) -> Option<SampleIndex> {
    let window = SampleWindow::backward(candidate, window_len, derivative.len());
    window
        .slice(derivative)
        .iter()
        .rposition(|&value| value < threshold)
        .map(|position| window.start + position + 1)
}

/// Refines every candidate onset, keeping candidates whose backtrack fails.
/// Refined onsets are strictly increasing: a candidate which refines onto an
/// onset already taken is merged into the earlier spike.
pub(crate) fn refine_onsets(
    sweep: SweepIndex,
    candidates: &[SampleIndex],
    derivative: &[Real],
    threshold: Real,
    window_len: usize,
    diagnostics: &mut Diagnostics,
) -> Vec<SampleIndex> {
    let mut onsets = Vec::<SampleIndex>::with_capacity(candidates.len());
    for &candidate in candidates {
        let onset = backtrack_onset(candidate, derivative, threshold, window_len)
            .unwrap_or_else(|| {
                diagnostics.push(Diagnostic::BacktrackSkipped { sweep, candidate });
                candidate
            });
        match onsets.last() {
            Some(&previous) if onset <= previous => {
                diagnostics.push(Diagnostic::CandidateMerged {
                    sweep,
                    candidate,
                    onset: previous,
                });
            }
            _ => onsets.push(onset),
        }
    }
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_back_to_start_of_rise() {
        //                 0    1    2     3     4     5     6
        let derivative = [0.0, 5.0, 12.0, 20.0, 35.0, 55.0, 80.0];
        assert_eq!(backtrack_onset(5, &derivative, 10.0, 4), Some(2));
    }

    #[test]
    fn no_step_when_previous_sample_below_threshold() {
        let derivative = [0.0, 0.0, 60.0];
        assert_eq!(backtrack_onset(2, &derivative, 10.0, 4), Some(2));
    }

    #[test]
    fn rise_longer_than_window_is_skipped() {
        let derivative = [0.0, 20.0, 20.0, 20.0, 20.0, 60.0];
        assert_eq!(backtrack_onset(5, &derivative, 10.0, 3), None);
    }

    #[test]
    fn candidate_at_sweep_start_is_skipped() {
        let derivative = [60.0, 0.0];
        assert_eq!(backtrack_onset(0, &derivative, 10.0, 3), None);
    }

    #[test]
    fn skipped_backtrack_keeps_candidate() {
        let derivative = [0.0, 20.0, 20.0, 20.0, 20.0, 60.0];
        let mut diagnostics = Diagnostics::default();
        let onsets = refine_onsets(3, &[5], &derivative, 10.0, 3, &mut diagnostics);
        assert_eq!(onsets, vec![5]);
        assert_eq!(
            diagnostics.into_inner(),
            vec![Diagnostic::BacktrackSkipped {
                sweep: 3,
                candidate: 5
            }]
        );
    }

    #[test]
    fn coincident_onsets_are_merged() {
        //                 0    1     2     3     4     5
        let derivative = [0.0, 20.0, 60.0, 40.0, 60.0, 0.0];
        let mut diagnostics = Diagnostics::default();
        let onsets = refine_onsets(0, &[2, 4], &derivative, 10.0, 4, &mut diagnostics);
        assert_eq!(onsets, vec![1]);
        assert_eq!(
            diagnostics.into_inner(),
            vec![Diagnostic::CandidateMerged {
                sweep: 0,
                candidate: 4,
                onset: 1
            }]
        );
    }
}
