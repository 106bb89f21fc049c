use metric_names::{DIAGNOSTICS, SPIKES_DETECTED, SWEEPS_PROCESSED};

pub mod metric_names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "sweeplab_";

    pub const DIAGNOSTICS: &str = concatcp!(METRIC_NAME_PREFIX, "diagnostics");
    pub const SPIKES_DETECTED: &str = concatcp!(METRIC_NAME_PREFIX, "spikes_detected");
    pub const SWEEPS_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "sweeps_processed");
}

/// Names and descriptions of every counter, for registration by binaries.
pub const COUNTERS: [(&str, &str); 3] = [
    (SWEEPS_PROCESSED, "Number of sweeps run through spike detection"),
    (SPIKES_DETECTED, "Number of spikes emitted by the detector"),
    (DIAGNOSTICS, "Recoverable conditions raised during detection"),
];

pub mod diagnostics {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, strum::Display)]
    pub enum DiagnosticKind {
        #[strum(to_string = "backtrack_skipped")]
        BacktrackSkipped,
        #[strum(to_string = "candidate_merged")]
        CandidateMerged,
        #[strum(to_string = "fast_phase_truncated")]
        FastPhaseTruncated,
        #[strum(to_string = "slow_phase_truncated")]
        SlowPhaseTruncated,
        #[strum(to_string = "trough_before_peak")]
        TroughBeforePeak,
    }

    // Label building function
    pub fn get_label(kind: DiagnosticKind) -> (&'static str, String) {
        ("diagnostic_kind", kind.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::diagnostics::{DiagnosticKind, get_label};

    #[test]
    fn labels_are_snake_case() {
        assert_eq!(
            get_label(DiagnosticKind::TroughBeforePeak),
            ("diagnostic_kind", "trough_before_peak".to_owned())
        );
        assert_eq!(
            DiagnosticKind::BacktrackSkipped.to_string(),
            "backtrack_skipped"
        );
    }

    #[test]
    fn metric_names_built_from_prefix() {
        assert_eq!(super::metric_names::DIAGNOSTICS, "sweeplab_diagnostics");
        assert_eq!(super::metric_names::SPIKES_DETECTED, "sweeplab_spikes_detected");
        assert_eq!(super::metric_names::SWEEPS_PROCESSED, "sweeplab_sweeps_processed");
    }

    #[test]
    fn metric_names_share_prefix() {
        for (name, _) in super::COUNTERS {
            assert!(name.starts_with(super::metric_names::METRIC_NAME_PREFIX));
        }
    }
}
