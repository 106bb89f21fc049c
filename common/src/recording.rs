//! Interchange format for complete, already-acquired recordings.
//!
//! A recording file holds every sweep's voltage samples together with the
//! sampling rate and the interval between sweep starts. Derivative traces
//! are not stored, consumers compute them on load.
use crate::{Real, SampleRate};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingFileError {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sample Rate Must Be Positive and Finite, got {0}")]
    InvalidSampleRate(SampleRate),
    #[error("Sweep {sweep} has {len} samples, expected {expected}")]
    RaggedSweeps {
        sweep: usize,
        len: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordingFile {
    /// Samples per second.
    pub sample_rate: SampleRate,
    /// Seconds between the start of consecutive sweeps.
    pub sweep_interval: Real,
    pub sweeps: Vec<Vec<Real>>,
}

impl RecordingFile {
    pub fn load(path: &Path) -> Result<Self, RecordingFileError> {
        let file = File::open(path)?;
        let recording: Self = serde_json::from_reader(BufReader::new(file))?;
        recording.validate()?;
        Ok(recording)
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordingFileError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Sweeps in one recording share a time base, so all must be the same length.
    pub fn validate(&self) -> Result<(), RecordingFileError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(RecordingFileError::InvalidSampleRate(self.sample_rate));
        }
        let expected = self.sweeps.first().map(Vec::len).unwrap_or_default();
        for (sweep, samples) in self.sweeps.iter().enumerate() {
            if samples.len() != expected {
                return Err(RecordingFileError::RaggedSweeps {
                    sweep,
                    len: samples.len(),
                    expected,
                });
            }
        }
        Ok(())
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let recording = RecordingFile {
            sample_rate: 20_000.0,
            sweep_interval: 1.5,
            sweeps: vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]],
        };
        let json = serde_json::to_string(&recording).unwrap();
        assert!(json.contains("sample-rate"));
        let parsed: RecordingFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, recording);
    }

    #[test]
    fn rejects_ragged_sweeps() {
        let recording = RecordingFile {
            sample_rate: 10_000.0,
            sweep_interval: 1.0,
            sweeps: vec![vec![0.0; 4], vec![0.0; 3]],
        };
        assert!(matches!(
            recording.validate(),
            Err(RecordingFileError::RaggedSweeps {
                sweep: 1,
                len: 3,
                expected: 4
            })
        ));
    }

    #[test]
    fn rejects_bad_sample_rate() {
        let recording = RecordingFile {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            recording.validate(),
            Err(RecordingFileError::InvalidSampleRate(_))
        ));
    }
}
