use crate::{DetectionError, DetectionResult};
use clap::Args;
use serde::{Deserialize, Serialize};
use sweeplab_common::Real;

pub const DEFAULT_ONSET_THRESHOLD: Real = 50.0;
pub const DEFAULT_RECOVERY_THRESHOLD: Real = -10.0;
pub const DEFAULT_BACKTRACK_THRESHOLD: Real = 10.0;
pub const DEFAULT_VALIDITY_WINDOW_MS: Real = 2.0;
pub const DEFAULT_BACKTRACK_WINDOW_MS: Real = 1.0;
pub const DEFAULT_FAST_FALL_WINDOW_MS: Real = 5.0;
pub const DEFAULT_FAST_RECOVER_WINDOW_MS: Real = 10.0;
pub const DEFAULT_SLOW_WINDOW_MS: Real = 10.0;

/// Thresholds are in signal units per millisecond, windows in milliseconds.
#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetectionParameters {
    /// The derivative must rise above this to register a candidate spike.
    #[clap(long, default_value_t = DEFAULT_ONSET_THRESHOLD, allow_negative_numbers = true)]
    pub onset_threshold: Real,

    /// A genuine spike repolarises with a derivative at or below this.
    #[clap(long, default_value_t = DEFAULT_RECOVERY_THRESHOLD, allow_negative_numbers = true)]
    pub recovery_threshold: Real,

    /// Onsets are walked back to where the derivative first exceeded this.
    #[clap(long, default_value_t = DEFAULT_BACKTRACK_THRESHOLD, allow_negative_numbers = true)]
    pub backtrack_threshold: Real,

    /// Time allowed after a candidate for the derivative to reach the recovery threshold.
    #[clap(long, default_value_t = DEFAULT_VALIDITY_WINDOW_MS)]
    pub validity_window_ms: Real,

    #[clap(long, default_value_t = DEFAULT_BACKTRACK_WINDOW_MS)]
    pub backtrack_window_ms: Real,

    #[clap(long, default_value_t = DEFAULT_FAST_FALL_WINDOW_MS)]
    pub fast_fall_window_ms: Real,

    #[clap(long, default_value_t = DEFAULT_FAST_RECOVER_WINDOW_MS)]
    pub fast_recover_window_ms: Real,

    /// Upper bound on the slow phase, shortened when the next spike arrives sooner.
    #[clap(long, default_value_t = DEFAULT_SLOW_WINDOW_MS)]
    pub slow_window_ms: Real,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            onset_threshold: DEFAULT_ONSET_THRESHOLD,
            recovery_threshold: DEFAULT_RECOVERY_THRESHOLD,
            backtrack_threshold: DEFAULT_BACKTRACK_THRESHOLD,
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
            backtrack_window_ms: DEFAULT_BACKTRACK_WINDOW_MS,
            fast_fall_window_ms: DEFAULT_FAST_FALL_WINDOW_MS,
            fast_recover_window_ms: DEFAULT_FAST_RECOVER_WINDOW_MS,
            slow_window_ms: DEFAULT_SLOW_WINDOW_MS,
        }
    }
}

/// Window lengths of [DetectionParameters] converted to sample counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowLengths {
    pub(crate) validity: usize,
    pub(crate) backtrack: usize,
    pub(crate) fast_fall: usize,
    pub(crate) fast_recover: usize,
    pub(crate) slow: usize,
}

impl DetectionParameters {
    pub fn validate(&self) -> DetectionResult<()> {
        let thresholds = [
            self.onset_threshold,
            self.recovery_threshold,
            self.backtrack_threshold,
        ];
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(DetectionError::InvalidParameters(
                "thresholds must be finite".to_owned(),
            ));
        }
        if self.onset_threshold <= self.recovery_threshold {
            return Err(DetectionError::InvalidParameters(format!(
                "onset threshold {} must exceed recovery threshold {}",
                self.onset_threshold, self.recovery_threshold
            )));
        }
        let windows = [
            ("validity", self.validity_window_ms),
            ("backtrack", self.backtrack_window_ms),
            ("fast fall", self.fast_fall_window_ms),
            ("fast recover", self.fast_recover_window_ms),
            ("slow", self.slow_window_ms),
        ];
        if let Some((name, ms)) = windows
            .into_iter()
            .find(|(_, ms)| !(ms.is_finite() && *ms > 0.0))
        {
            return Err(DetectionError::InvalidParameters(format!(
                "{name} window must be positive, got {ms} ms"
            )));
        }
        // A validated candidate dips within the validity window of a point at
        // most one backtrack window after its onset.
        if self.fast_fall_window_ms < self.validity_window_ms + self.backtrack_window_ms {
            return Err(DetectionError::InvalidParameters(format!(
                "fast fall window {} ms must cover validity and backtrack windows {} ms",
                self.fast_fall_window_ms,
                self.validity_window_ms + self.backtrack_window_ms
            )));
        }
        Ok(())
    }

    /// As [Self::validate], also checking the windows once rounded to samples.
    pub fn validate_at(&self, points_per_ms: Real) -> DetectionResult<()> {
        self.validate()?;
        self.window_lengths(points_per_ms).map(drop)
    }

    pub(crate) fn window_lengths(&self, points_per_ms: Real) -> DetectionResult<WindowLengths> {
        let samples = |ms: Real| ((ms * points_per_ms).round() as usize).max(1);
        let lengths = WindowLengths {
            validity: samples(self.validity_window_ms),
            backtrack: samples(self.backtrack_window_ms),
            fast_fall: samples(self.fast_fall_window_ms),
            fast_recover: samples(self.fast_recover_window_ms),
            slow: samples(self.slow_window_ms),
        };
        if lengths.fast_fall < lengths.validity + lengths.backtrack {
            return Err(DetectionError::InvalidParameters(format!(
                "fast fall window of {} samples must cover validity and backtrack windows of {} samples",
                lengths.fast_fall,
                lengths.validity + lengths.backtrack
            )));
        }
        Ok(lengths)
    }
}
