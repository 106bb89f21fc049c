use strum::Display;
use sweeplab_common::{RecordingFileError, SampleIndex, SweepIndex};
use thiserror::Error;

pub type DetectionResult<T> = Result<T, DetectionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[strum(to_string = "fast phase")]
    Fast,
    #[strum(to_string = "slow phase")]
    Slow,
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Sweep {sweep} Out of Range, recording has {sweep_count} sweeps")]
    SweepOutOfRange {
        sweep: SweepIndex,
        sweep_count: usize,
    },
    #[error("Sweep {sweep}: voltage has {voltage} samples but derivative has {derivative}")]
    LengthMismatch {
        sweep: SweepIndex,
        voltage: usize,
        derivative: usize,
    },
    #[error("Sample Rate Must Be Positive and Finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("Invalid Detection Parameters: {0}")]
    InvalidParameters(String),
    #[error("Sweep {sweep}: no repolarisation found after onset {onset}")]
    NoRepolarisation {
        sweep: SweepIndex,
        onset: SampleIndex,
    },
    #[error("Sweep {sweep}: empty {phase} window at onset {onset}")]
    EmptyWindow {
        sweep: SweepIndex,
        onset: SampleIndex,
        phase: Phase,
    },
    #[error("Sweep {sweep}: spike at onset {onset} is inconsistent: {reason}")]
    InconsistentSpike {
        sweep: SweepIndex,
        onset: SampleIndex,
        reason: &'static str,
    },
    #[error("Cannot get lock on Detection Store. Lock poisoned.")]
    LockPoisoned,
    #[error("Detection Store has not been populated")]
    NotDetected,
    #[error("{0}")]
    RecordingFile(#[from] RecordingFileError),
}
