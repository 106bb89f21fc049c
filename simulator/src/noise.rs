use crate::{error::SimulatorResult, json};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use sweeplab_common::Real;

impl json::NoiseSource {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulatorResult<Real> {
        match self.attributes {
            json::NoiseAttributes::Uniform { min, max } => {
                Ok((max - min) * rng.random::<Real>() + min)
            }
            json::NoiseAttributes::Gaussian { mean, sd } => Ok(Normal::new(mean, sd)?.sample(rng)),
        }
    }

    fn smooth(&self, new_value: Real, old_value: Real) -> Real {
        new_value * (1.0 - self.smoothing_factor) + old_value * self.smoothing_factor
    }
}

/// Stateful noise generator, one per source per sweep.
pub(crate) struct Noise<'a> {
    source: &'a json::NoiseSource,
    prev: Real,
}

impl<'a> Noise<'a> {
    pub(crate) fn new(source: &'a json::NoiseSource) -> Self {
        Self {
            source,
            prev: Real::default(),
        }
    }

    pub(crate) fn noisify<R: Rng + ?Sized>(
        &mut self,
        value: Real,
        rng: &mut R,
    ) -> SimulatorResult<Real> {
        self.prev = self.source.smooth(self.source.sample(rng)?, self.prev);
        Ok(value + self.prev)
    }
}
