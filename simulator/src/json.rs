//! Simulation description, deserialised from a kebab-case JSON file.
use crate::error::{SimulatorError, SimulatorResult};
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::Deserialize;
use std::ops::Range;
use sweeplab_common::{Real, SampleRate};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", tag = "random-type")]
pub(crate) enum FloatRandomDistribution {
    Constant { value: Real },
    Uniform { min: Real, max: Real },
    Normal { mean: Real, sd: Real },
    Exponential { lifetime: Real },
}

impl FloatRandomDistribution {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulatorResult<Real> {
        match *self {
            Self::Constant { value } => Ok(value),
            Self::Uniform { min, max } => {
                if min < max {
                    Ok(rng.random_range(min..max))
                } else {
                    Err(SimulatorError::InvalidInterval { min, max })
                }
            }
            Self::Normal { mean, sd } => Ok(Normal::new(mean, sd)?.sample(rng)),
            Self::Exponential { lifetime } => Ok(Exp::new(1.0 / lifetime)?.sample(rng)),
        }
    }
}

/// Times in milliseconds from the start of the sweep.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Interval {
    pub(crate) start: Real,
    pub(crate) end: Real,
}

impl Interval {
    pub(crate) fn range(&self) -> Range<Real> {
        self.start..self.end
    }

    pub(crate) fn is_in(&self, time: Real) -> bool {
        self.range().contains(&time)
    }
}

/// A square offset applied to the membrane potential, as produced by a current step.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CurrentStep {
    pub(crate) window: Interval,
    /// In mV, positive for a depolarising step.
    pub(crate) offset: Real,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "timing-type")]
pub(crate) enum Timing {
    Regular { period_ms: Real },
    Exponential { mean_interval_ms: Real },
}

/// Shape of each action potential, every quantity is drawn afresh per spike.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ActionPotentialTemplate {
    /// Height above the pre-spike potential, in mV.
    pub(crate) amplitude: FloatRandomDistribution,
    pub(crate) rise_ms: FloatRandomDistribution,
    pub(crate) fall_ms: FloatRandomDistribution,
    /// Depth of the after-hyperpolarisation below the pre-spike potential, in mV.
    pub(crate) undershoot: FloatRandomDistribution,
    /// Time constant of the return from the after-hyperpolarisation.
    pub(crate) recovery_ms: FloatRandomDistribution,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct SpikeTrain {
    pub(crate) window: Interval,
    pub(crate) timing: Timing,
    pub(crate) waveform: ActionPotentialTemplate,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "noise-type")]
pub(crate) enum NoiseAttributes {
    Uniform { min: Real, max: Real },
    Gaussian { mean: Real, sd: Real },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct NoiseSource {
    pub(crate) attributes: NoiseAttributes,
    /// Weight of the previous noise value, 0 gives white noise.
    #[serde(default)]
    pub(crate) smoothing_factor: Real,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Simulation {
    pub(crate) sample_rate: SampleRate,
    pub(crate) sweep_count: usize,
    pub(crate) sweep_length_ms: Real,
    /// Seconds between sweep starts, defaults to the sweep length.
    pub(crate) sweep_interval: Option<Real>,
    /// Resting membrane potential, in mV.
    pub(crate) baseline: Real,
    pub(crate) current_step: Option<CurrentStep>,
    #[serde(default)]
    pub(crate) spike_trains: Vec<SpikeTrain>,
    #[serde(default)]
    pub(crate) noises: Vec<NoiseSource>,
}

impl Simulation {
    pub(crate) fn validate(&self) -> SimulatorResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(SimulatorError::InvalidSimulation(
                "sample rate must be positive",
            ));
        }
        if !(self.sweep_length_ms.is_finite() && self.sweep_length_ms > 0.0) {
            return Err(SimulatorError::InvalidSimulation(
                "sweep length must be positive",
            ));
        }
        for train in &self.spike_trains {
            let valid = match train.timing {
                Timing::Regular { period_ms } => period_ms > 0.0,
                Timing::Exponential { mean_interval_ms } => mean_interval_ms > 0.0,
            };
            if !valid {
                return Err(SimulatorError::InvalidSimulation(
                    "spike intervals must be positive",
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn samples_per_sweep(&self) -> usize {
        (self.sweep_length_ms * self.sample_rate / 1000.0).round() as usize
    }

    pub(crate) fn sweep_interval(&self) -> Real {
        self.sweep_interval
            .unwrap_or(self.sweep_length_ms / 1000.0)
    }
}
