//! Action-potential detection over multi-sweep electrophysiology recordings.
//!
//! A [SpikeDetector] owns a [RecordingSource] and the spikes detected in it.
//! Detection of a single sweep is exposed as [detect_sweep_spikes] for
//! callers which manage their own storage.
mod error;
mod parameters;
mod recording;
mod spike;
pub mod spike_detection;
mod store;
mod summary;

pub use error::{DetectionError, DetectionResult, Phase};
pub use parameters::DetectionParameters;
pub use recording::{Recording, RecordingSource, SweepData, derivative};
pub use spike::{IndexRange, IndexValue, Spike};
pub use spike_detection::{SweepDetection, detect_sweep_spikes, diagnostics::Diagnostic};
pub use store::{DetectionState, SpikeCollection, SpikeDetector};
pub use summary::{CommandWindow, SummaryReference, SweepSummary};
