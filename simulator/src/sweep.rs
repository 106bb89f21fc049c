use crate::{
    action_potential::ActionPotential,
    error::SimulatorResult,
    json::{Simulation, SpikeTrain, Timing},
    noise::Noise,
};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use sweeplab_common::{MS_PER_SECOND, Real, RecordingFile};
use tracing::{debug, info};

/// Onset times of the train, in ms from the start of the sweep.
pub(crate) fn spike_times<R: Rng + ?Sized>(
    train: &SpikeTrain,
    rng: &mut R,
) -> SimulatorResult<Vec<Real>> {
    let window = train.window;
    let times = match train.timing {
        Timing::Regular { period_ms } => (0..)
            .map(|k| window.start + k as Real * period_ms)
            .take_while(|&time| window.is_in(time))
            .collect(),
        Timing::Exponential { mean_interval_ms } => {
            let intervals = Exp::new(1.0 / mean_interval_ms)?;
            let mut times = Vec::new();
            let mut time = window.start + intervals.sample(rng);
            while window.is_in(time) {
                times.push(time);
                time += intervals.sample(rng);
            }
            times
        }
    };
    Ok(times)
}

pub(crate) fn generate_sweep<R: Rng + ?Sized>(
    simulation: &Simulation,
    rng: &mut R,
) -> SimulatorResult<Vec<Real>> {
    let mut action_potentials = Vec::new();
    for train in &simulation.spike_trains {
        for start in spike_times(train, rng)? {
            action_potentials.push(ActionPotential::sample(&train.waveform, start, rng)?);
        }
    }
    debug!("{} action potentials in sweep", action_potentials.len());

    let ms_per_sample = MS_PER_SECOND / simulation.sample_rate;
    let mut noises: Vec<_> = simulation.noises.iter().map(Noise::new).collect();
    (0..simulation.samples_per_sweep())
        .map(|i| {
            let time = i as Real * ms_per_sample;
            let step = simulation
                .current_step
                .as_ref()
                .filter(|step| step.window.is_in(time))
                .map(|step| step.offset)
                .unwrap_or_default();
            let value = action_potentials
                .iter()
                .filter(|ap| ap.start <= time && time < ap.end())
                .map(|ap| ap.get_value_at(time))
                .sum::<Real>()
                + simulation.baseline
                + step;
            noises
                .iter_mut()
                .try_fold(value, |value, noise| noise.noisify(value, rng))
        })
        .collect()
}

pub(crate) fn run_simulation<R: Rng + ?Sized>(
    simulation: &Simulation,
    rng: &mut R,
) -> SimulatorResult<RecordingFile> {
    simulation.validate()?;
    let sweeps = (0..simulation.sweep_count)
        .map(|_| generate_sweep(simulation, rng))
        .collect::<SimulatorResult<Vec<_>>>()?;
    info!(
        "simulated {} sweeps of {} samples",
        sweeps.len(),
        simulation.samples_per_sweep()
    );
    Ok(RecordingFile {
        sample_rate: simulation.sample_rate,
        sweep_interval: simulation.sweep_interval(),
        sweeps,
    })
}
