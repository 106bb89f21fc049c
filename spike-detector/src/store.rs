//! The detection store: owner of every spike detected in an experiment.
use crate::{
    DetectionError, DetectionParameters, DetectionResult, RecordingSource, Spike,
    spike_detection::{SweepDetection, detect_sweep_spikes, diagnostics::Diagnostic},
    summary::{SummaryReference, SweepSummary, nan_mean, nan_median},
};
use rayon::prelude::*;
use std::{
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};
use sweeplab_common::{Real, SweepIndex};
use tracing::{debug, info};

/// Spikes and diagnostics of every detected sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeCollection {
    spikes: Vec<Spike>,
    diagnostics: Vec<Diagnostic>,
}

impl SpikeCollection {
    /// Replaces everything previously detected in the sweep, keeping spikes ordered by sweep.
    pub(crate) fn replace_sweep(&mut self, detection: SweepDetection) {
        let sweep = detection.sweep;
        let before = self.spikes.len();
        self.spikes.retain(|spike| spike.sweep != sweep);
        self.diagnostics
            .retain(|diagnostic| diagnostic.sweep() != sweep);
        if before > self.spikes.len() {
            debug!(
                "deleting {} existing spikes of sweep {sweep} from memory",
                before - self.spikes.len()
            );
        }
        let at = self.spikes.partition_point(|spike| spike.sweep < sweep);
        let later = self.spikes.split_off(at);
        self.spikes.extend(detection.spikes.into_iter().chain(later));

        let at = self
            .diagnostics
            .partition_point(|diagnostic| diagnostic.sweep() < sweep);
        let later = self.diagnostics.split_off(at);
        self.diagnostics
            .extend(detection.diagnostics.into_iter().chain(later));
    }

    fn append(&mut self, mut detection: SweepDetection) {
        self.spikes.append(&mut detection.spikes);
        self.diagnostics.append(&mut detection.diagnostics);
    }

    pub fn spikes(&self) -> &[Spike] {
        &self.spikes
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn sweep_spikes(&self, sweep: SweepIndex) -> impl Iterator<Item = &Spike> {
        self.spikes.iter().filter(move |spike| spike.sweep == sweep)
    }

    pub fn len(&self) -> usize {
        self.spikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spikes.is_empty()
    }
}

impl FromIterator<SweepDetection> for SpikeCollection {
    fn from_iter<I: IntoIterator<Item = SweepDetection>>(iter: I) -> Self {
        let mut collection = Self::default();
        for detection in iter {
            collection.append(detection);
        }
        collection
    }
}

/// An empty collection after detection is distinct from no detection at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetectionState {
    #[default]
    NotDetected,
    Detected(SpikeCollection),
}

impl DetectionState {
    pub fn collection(&self) -> Option<&SpikeCollection> {
        match self {
            Self::NotDetected => None,
            Self::Detected(collection) => Some(collection),
        }
    }
}

/// Runs spike detection over a recording and answers queries about the result.
///
/// Detection of a sweep is computed without holding the lock on the store,
/// the result is then swapped in under a single write lock. Readers never
/// observe a sweep with both its old and new spikes, or with neither.
pub struct SpikeDetector<S: RecordingSource> {
    source: S,
    parameters: DetectionParameters,
    state: RwLock<DetectionState>,
}

impl<S: RecordingSource> SpikeDetector<S> {
    pub fn new(source: S, parameters: DetectionParameters) -> DetectionResult<Self> {
        parameters.validate_at(source.points_per_ms())?;
        Ok(Self {
            source,
            parameters,
            state: RwLock::default(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn parameters(&self) -> &DetectionParameters {
        &self.parameters
    }

    /// Takes effect on the next detection, existing spikes are kept.
    pub fn set_parameters(&mut self, parameters: DetectionParameters) -> DetectionResult<()> {
        parameters.validate_at(self.source.points_per_ms())?;
        self.parameters = parameters;
        Ok(())
    }

    fn read_state(&self) -> DetectionResult<RwLockReadGuard<'_, DetectionState>> {
        self.state.read().map_err(|_| DetectionError::LockPoisoned)
    }

    fn write_state(&self) -> DetectionResult<RwLockWriteGuard<'_, DetectionState>> {
        self.state.write().map_err(|_| DetectionError::LockPoisoned)
    }

    pub fn is_detected(&self) -> DetectionResult<bool> {
        Ok(self.read_state()?.collection().is_some())
    }

    /// Detects spikes in every sweep, replacing any earlier result.
    /// On error the store is left as it was.
    pub fn detect_all(&self) -> DetectionResult<()> {
        info!("initializing spike detection on all sweeps...");
        let start = Instant::now();
        let collection = (0..self.source.sweep_count())
            .map(|sweep| detect_sweep_spikes(&self.source, sweep, &self.parameters))
            .collect::<DetectionResult<SpikeCollection>>()?;
        self.finish_detect_all(collection, start)
    }

    /// As [Self::detect_all], with sweeps analysed in parallel.
    pub fn detect_all_parallel(&self) -> DetectionResult<()> {
        info!("initializing parallel spike detection on all sweeps...");
        let start = Instant::now();
        let detections = (0..self.source.sweep_count())
            .into_par_iter()
            .map(|sweep| detect_sweep_spikes(&self.source, sweep, &self.parameters))
            .collect::<DetectionResult<Vec<_>>>()?;
        self.finish_detect_all(detections.into_iter().collect(), start)
    }

    fn finish_detect_all(&self, collection: SpikeCollection, start: Instant) -> DetectionResult<()> {
        info!(
            "spike analysis of {} sweeps found {} spikes (completed in {:?})",
            self.source.sweep_count(),
            collection.len(),
            start.elapsed()
        );
        *self.write_state()? = DetectionState::Detected(collection);
        Ok(())
    }

    /// Re-detects one sweep, leaving the spikes of every other sweep untouched.
    pub fn detect_sweep(&self, sweep: SweepIndex) -> DetectionResult<()> {
        let detection = detect_sweep_spikes(&self.source, sweep, &self.parameters)?;
        let mut state = self.write_state()?;
        debug!(
            "initiating spike detection of sweep {sweep} ({} already in memory)",
            state.collection().map(SpikeCollection::len).unwrap_or_default()
        );
        match &mut *state {
            DetectionState::Detected(collection) => collection.replace_sweep(detection),
            DetectionState::NotDetected => {
                *state = DetectionState::Detected(SpikeCollection::from_iter([detection]))
            }
        }
        Ok(())
    }

    /// Runs [Self::detect_all] if detection has never been run.
    pub fn ensure_detection(&self) -> DetectionResult<()> {
        if !self.is_detected()? {
            debug!("analysis attempted before spike detection...");
            self.detect_all()?;
        }
        Ok(())
    }

    fn with_collection<T>(&self, f: impl FnOnce(&SpikeCollection) -> T) -> DetectionResult<T> {
        self.ensure_detection()?;
        let state = self.read_state()?;
        state
            .collection()
            .map(f)
            .ok_or(DetectionError::NotDetected)
    }

    pub fn info(&self) -> DetectionResult<()> {
        match self.read_state()?.collection() {
            Some(collection) => info!("{} spikes in memory.", collection.len()),
            None => info!("spike detection has not been run."),
        }
        Ok(())
    }

    pub fn spikes(&self) -> DetectionResult<Vec<Spike>> {
        self.with_collection(|collection| collection.spikes().to_vec())
    }

    pub fn sweep_spikes(&self, sweep: SweepIndex) -> DetectionResult<Vec<Spike>> {
        self.with_collection(|collection| collection.sweep_spikes(sweep).cloned().collect())
    }

    pub fn diagnostics(&self) -> DetectionResult<Vec<Diagnostic>> {
        self.with_collection(|collection| collection.diagnostics().to_vec())
    }

    /// Times of all spikes in seconds from the start of the experiment, ascending.
    pub fn spike_times(&self) -> DetectionResult<Vec<Real>> {
        self.with_collection(|collection| {
            let mut times: Vec<Real> = collection.spikes().iter().map(|spike| spike.time).collect();
            times.sort_by(Real::total_cmp);
            times
        })
    }

    /// Times of the spikes of each sweep in seconds from the start of the sweep, ascending.
    pub fn spike_times_by_sweep(&self) -> DetectionResult<Vec<Vec<Real>>> {
        self.by_sweep(|collection, sweep| {
            let mut times: Vec<Real> = collection
                .sweep_spikes(sweep)
                .map(|spike| spike.time_in_sweep)
                .collect();
            times.sort_by(Real::total_cmp);
            times
        })
    }

    pub fn count_by_sweep(&self) -> DetectionResult<Vec<usize>> {
        self.by_sweep(|collection, sweep| collection.sweep_spikes(sweep).count())
    }

    /// Instantaneous frequencies of each sweep in onset order, each list led by a NaN.
    pub fn freqs_by_sweep(&self) -> DetectionResult<Vec<Vec<Real>>> {
        self.by_sweep(sweep_frequencies)
    }

    pub fn freq_average_by_sweep(&self) -> DetectionResult<Vec<Real>> {
        self.by_sweep(|collection, sweep| nan_mean(&sweep_frequencies(collection, sweep)))
    }

    pub fn freq_median_by_sweep(&self) -> DetectionResult<Vec<Real>> {
        self.by_sweep(|collection, sweep| nan_median(&sweep_frequencies(collection, sweep)))
    }

    pub fn sweep_summary(
        &self,
        sweep: SweepIndex,
        reference: &SummaryReference,
    ) -> DetectionResult<SweepSummary> {
        let sweep_count = self.source.sweep_count();
        if sweep >= sweep_count {
            return Err(DetectionError::SweepOutOfRange { sweep, sweep_count });
        }
        self.with_collection(|collection| {
            SweepSummary::from_spikes(sweep, collection.sweep_spikes(sweep), reference)
        })
    }

    pub fn summaries(&self, reference: &SummaryReference) -> DetectionResult<Vec<SweepSummary>> {
        self.by_sweep(|collection, sweep| {
            SweepSummary::from_spikes(sweep, collection.sweep_spikes(sweep), reference)
        })
    }

    fn by_sweep<T>(&self, f: impl Fn(&SpikeCollection, SweepIndex) -> T) -> DetectionResult<Vec<T>> {
        self.with_collection(|collection| {
            (0..self.source.sweep_count())
                .map(|sweep| f(collection, sweep))
                .collect()
        })
    }
}

fn sweep_frequencies(collection: &SpikeCollection, sweep: SweepIndex) -> Vec<Real> {
    let mut spikes: Vec<&Spike> = collection.sweep_spikes(sweep).collect();
    spikes.sort_by_key(|spike| spike.onset);
    spikes.into_iter().map(|spike| spike.frequency).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recording;

    fn spiking_sweep(len: usize, onsets: &[usize]) -> Vec<Real> {
        let mut derivative = vec![0.0; len];
        for &onset in onsets {
            derivative[onset..onset + 10].iter_mut().for_each(|d| *d = 100.0);
            derivative[onset + 10..onset + 40].iter_mut().for_each(|d| *d = -40.0);
        }
        derivative
    }

    fn detector(sweeps: &[&[usize]]) -> SpikeDetector<Recording> {
        let sweeps = sweeps
            .iter()
            .map(|onsets| {
                let derivative = spiking_sweep(2000, onsets);
                let voltage = derivative
                    .iter()
                    .scan(-65.0, |v, d| {
                        *v += d / 20.0;
                        Some(*v)
                    })
                    .collect();
                (voltage, derivative)
            })
            .collect();
        let recording = Recording::from_traces(20_000.0, 0.5, sweeps).unwrap();
        SpikeDetector::new(recording, DetectionParameters::default()).unwrap()
    }

    #[test]
    fn starts_undetected() {
        let detector = detector(&[&[100]]);
        assert!(!detector.is_detected().unwrap());
        detector.info().unwrap();
    }

    #[test]
    fn accessors_detect_automatically() {
        let detector = detector(&[&[100, 600], &[], &[300]]);
        assert_eq!(detector.count_by_sweep().unwrap(), vec![2, 0, 1]);
        assert!(detector.is_detected().unwrap());
    }

    #[test]
    fn empty_result_is_still_detected() {
        let detector = detector(&[&[], &[]]);
        detector.detect_all().unwrap();
        assert!(detector.is_detected().unwrap());
        assert!(detector.spikes().unwrap().is_empty());
    }

    #[test]
    fn detect_sweep_before_detect_all() {
        let detector = detector(&[&[100], &[200]]);
        detector.detect_sweep(1).unwrap();
        assert!(detector.is_detected().unwrap());
        // no automatic full detection once a sweep has been detected
        assert_eq!(detector.count_by_sweep().unwrap(), vec![0, 1]);
    }

    #[test]
    fn spike_times_are_sorted_across_sweeps() {
        let detector = detector(&[&[1000], &[100]]);
        detector.detect_sweep(1).unwrap();
        detector.detect_sweep(0).unwrap();
        let times = detector.spike_times().unwrap();
        assert_eq!(times.len(), 2);
        assert!(times[0] < times[1]);
        // sweep 1 starts 0.5 s into the experiment
        assert!((times[1] - (0.5 + 100.0 / 20_000.0)).abs() < 1e-9);
    }

    #[test]
    fn frequencies_by_sweep() {
        let detector = detector(&[&[100, 300, 500], &[200]]);
        let freqs = detector.freqs_by_sweep().unwrap();
        assert_eq!(freqs[0].len(), 3);
        assert!(freqs[0][0].is_nan());
        assert!((freqs[0][1] - 100.0).abs() < 1e-9);
        assert_eq!(freqs[1].len(), 1);
        let averages = detector.freq_average_by_sweep().unwrap();
        assert!((averages[0] - 100.0).abs() < 1e-9);
        assert!(averages[1].is_nan());
        let medians = detector.freq_median_by_sweep().unwrap();
        assert!((medians[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn summary_of_missing_sweep() {
        let detector = detector(&[&[100]]);
        assert!(matches!(
            detector.sweep_summary(4, &SummaryReference::default()),
            Err(DetectionError::SweepOutOfRange {
                sweep: 4,
                sweep_count: 1
            })
        ));
    }

    #[test]
    fn redetection_keeps_sweep_order() {
        let detector = detector(&[&[100], &[200], &[300]]);
        detector.detect_all().unwrap();
        detector.detect_sweep(1).unwrap();
        let sweeps: Vec<_> = detector
            .spikes()
            .unwrap()
            .iter()
            .map(|spike| spike.sweep)
            .collect();
        assert_eq!(sweeps, vec![0, 1, 2]);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let mut detector = detector(&[&[100]]);
        let parameters = DetectionParameters {
            validity_window_ms: -1.0,
            ..Default::default()
        };
        assert!(detector.set_parameters(parameters).is_err());
        assert_eq!(detector.parameters(), &DetectionParameters::default());
    }

    #[test]
    fn short_fast_fall_window_rejected_before_detection() {
        let mut detector = detector(&[&[1000]]);
        let parameters = DetectionParameters {
            fast_fall_window_ms: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            detector.set_parameters(parameters.clone()),
            Err(DetectionError::InvalidParameters(_))
        ));
        let recording = Recording::from_voltages(20_000.0, 1.0, vec![vec![0.0; 100]]).unwrap();
        assert!(matches!(
            SpikeDetector::new(recording, parameters),
            Err(DetectionError::InvalidParameters(_))
        ));
        assert_eq!(detector.count_by_sweep().unwrap(), vec![1]);
    }
}
