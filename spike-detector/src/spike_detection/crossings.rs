use super::window::SampleWindow;
use itertools::Itertools;
use sweeplab_common::{Real, SampleIndex};

/// Indices at which `trace` first rises above `threshold`, one per excursion.
/// An excursion already in progress at the first sample is reported at index 0.
pub(crate) fn rising_crossings(trace: &[Real], threshold: Real) -> Vec<SampleIndex> {
    let initial = trace.first().filter(|&&value| value > threshold).map(|_| 0);
    initial
        .into_iter()
        .chain(
            trace
                .iter()
                .enumerate()
                .tuple_windows()
                .filter_map(|((_, prev), (i, next))| {
                    (*prev <= threshold && *next > threshold).then_some(i)
                }),
        )
        .collect()
}

/// Keeps the candidates whose derivative reaches `recovery_threshold`
/// within `lookahead` samples. Spikes repolarise quickly, noise does not.
pub(crate) fn repolarising(
    candidates: &[SampleIndex],
    derivative: &[Real],
    recovery_threshold: Real,
    lookahead: usize,
) -> Vec<SampleIndex> {
    candidates
        .iter()
        .copied()
        .filter(|&candidate| {
            SampleWindow::forward(candidate, lookahead, derivative.len())
                .slice(derivative)
                .iter()
                .any(|&value| value <= recovery_threshold)
        })
        .collect()
}
