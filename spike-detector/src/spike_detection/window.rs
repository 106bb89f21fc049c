use crate::spike::IndexRange;
use sweeplab_common::SampleIndex;

/// A window of sample indices clamped to the extent of a trace.
/// `truncated` is set when the requested length did not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SampleWindow {
    pub(crate) start: SampleIndex,
    pub(crate) end: SampleIndex,
    pub(crate) truncated: bool,
}

impl SampleWindow {
    /// Up to `len` samples beginning at `start`.
    pub(crate) fn forward(start: SampleIndex, len: usize, trace_len: usize) -> Self {
        let start = start.min(trace_len);
        let wanted = start.saturating_add(len);
        let end = wanted.min(trace_len);
        Self {
            start,
            end,
            truncated: end < wanted,
        }
    }

    /// Up to `len` samples ending immediately before `end`.
    pub(crate) fn backward(end: SampleIndex, len: usize, trace_len: usize) -> Self {
        let end = end.min(trace_len);
        let start = end.saturating_sub(len);
        Self {
            start,
            end,
            truncated: end - start < len,
        }
    }

    pub(crate) fn slice<'a, T>(&self, trace: &'a [T]) -> &'a [T] {
        trace.get(self.start..self.end).unwrap_or_default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub(crate) fn range(&self) -> IndexRange {
        IndexRange {
            start: self.start,
            end: self.end,
        }
    }
}
