use spike_detector::{DetectionParameters, Recording, Spike, SpikeDetector};
use sweeplab_common::Real;

pub const SAMPLE_RATE: Real = 20_000.0;
pub const POINTS_PER_MS: Real = 20.0;
pub const SWEEP_LEN: usize = 4000;

/// A derivative event: rises to `height` for 10 samples then dips to -40 for 30.
#[derive(Clone, Copy)]
pub struct Event {
    pub at: usize,
    pub height: Real,
}

pub const fn spike(at: usize) -> Event {
    Event { at, height: 100.0 }
}

pub const fn small(at: usize) -> Event {
    Event { at, height: 40.0 }
}

pub fn sweep(events: &[Event]) -> (Vec<Real>, Vec<Real>) {
    let mut derivative = vec![0.0; SWEEP_LEN];
    for event in events {
        derivative[event.at..event.at + 10].fill(event.height);
        derivative[event.at + 10..event.at + 40].fill(-40.0);
    }
    let voltage = derivative
        .iter()
        .scan(-65.0, |voltage, d| {
            *voltage += d / POINTS_PER_MS;
            Some(*voltage)
        })
        .collect();
    (voltage, derivative)
}

pub fn recording(sweeps: &[&[Event]]) -> Recording {
    Recording::from_traces(
        SAMPLE_RATE,
        1.0,
        sweeps.iter().map(|events| sweep(events)).collect(),
    )
    .unwrap()
}

pub fn detector(sweeps: &[&[Event]]) -> SpikeDetector<Recording> {
    SpikeDetector::new(recording(sweeps), DetectionParameters::default()).unwrap()
}

/// Spikes rendered field by field, so that NaN frequencies compare equal.
pub fn fingerprint(spikes: &[Spike]) -> Vec<String> {
    spikes.iter().map(|spike| format!("{spike:?}")).collect()
}
