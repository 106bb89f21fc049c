pub mod metrics;
pub mod recording;
pub mod tracer;

pub use recording::{RecordingFile, RecordingFileError};

/// Index of a sweep within an experiment.
pub type SweepIndex = usize;
/// Index of a sample within a sweep.
pub type SampleIndex = usize;
/// Sampling rate, in samples per second.
pub type SampleRate = f64;
/// Scalar type of every trace and derived quantity.
pub type Real = f64;

pub const MS_PER_SECOND: Real = 1000.0;
