//! Recoverable conditions raised while detecting spikes.
//!
//! None of these abort detection. Each is logged and counted when pushed,
//! and kept alongside the spikes of its sweep so callers can inspect them.
use metrics::counter;
use serde::{Deserialize, Serialize};
use sweeplab_common::{
    SampleIndex, SweepIndex,
    metrics::{
        diagnostics::{DiagnosticKind, get_label},
        metric_names::DIAGNOSTICS,
    },
};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// No backtrack threshold crossing in the backtrack window, the candidate is kept as is.
    BacktrackSkipped {
        sweep: SweepIndex,
        candidate: SampleIndex,
    },
    /// The refined onset coincided with that of the preceding spike.
    CandidateMerged {
        sweep: SweepIndex,
        candidate: SampleIndex,
        onset: SampleIndex,
    },
    /// The derivative had not recovered by the end of the search window.
    FastPhaseTruncated {
        sweep: SweepIndex,
        onset: SampleIndex,
        end: SampleIndex,
    },
    /// The sweep ended before the slow phase window was filled.
    SlowPhaseTruncated {
        sweep: SweepIndex,
        onset: SampleIndex,
        end: SampleIndex,
    },
    TroughBeforePeak {
        sweep: SweepIndex,
        onset: SampleIndex,
        peak: SampleIndex,
        trough: SampleIndex,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::BacktrackSkipped { .. } => DiagnosticKind::BacktrackSkipped,
            Self::CandidateMerged { .. } => DiagnosticKind::CandidateMerged,
            Self::FastPhaseTruncated { .. } => DiagnosticKind::FastPhaseTruncated,
            Self::SlowPhaseTruncated { .. } => DiagnosticKind::SlowPhaseTruncated,
            Self::TroughBeforePeak { .. } => DiagnosticKind::TroughBeforePeak,
        }
    }

    pub fn sweep(&self) -> SweepIndex {
        match *self {
            Self::BacktrackSkipped { sweep, .. }
            | Self::CandidateMerged { sweep, .. }
            | Self::FastPhaseTruncated { sweep, .. }
            | Self::SlowPhaseTruncated { sweep, .. }
            | Self::TroughBeforePeak { sweep, .. } => sweep,
        }
    }

    fn log(&self) {
        match self {
            Self::BacktrackSkipped { sweep, candidate } => {
                debug!("not stepping back spike at {candidate} of sweep {sweep}")
            }
            Self::CandidateMerged {
                sweep,
                candidate,
                onset,
            } => debug!("candidate {candidate} of sweep {sweep} merged into spike at {onset}"),
            Self::FastPhaseTruncated { sweep, onset, end } => {
                warn!("fast phase of spike at {onset} of sweep {sweep} truncated at {end}")
            }
            Self::SlowPhaseTruncated { sweep, onset, end } => {
                debug!("slow phase of spike at {onset} of sweep {sweep} truncated at {end}")
            }
            Self::TroughBeforePeak {
                sweep,
                onset,
                peak,
                trough,
            } => error!(
                "spike at {onset} of sweep {sweep}: trough at {trough} precedes peak at {peak}"
            ),
        }
    }
}

/// Collects the diagnostics of one sweep.
#[derive(Debug, Default, Clone)]
pub(crate) struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        counter!(DIAGNOSTICS, &[get_label(diagnostic.kind())]).increment(1);
        self.0.push(diagnostic);
    }

    pub(crate) fn into_inner(self) -> Vec<Diagnostic> {
        self.0
    }
}
