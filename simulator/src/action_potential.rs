use crate::{error::SimulatorResult, json};
use rand::Rng;
use sweeplab_common::Real;

/// One action potential, relative to the potential it starts from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActionPotential {
    /// Onset, in ms from the start of the sweep.
    pub(crate) start: Real,
    pub(crate) amplitude: Real,
    pub(crate) rise: Real,
    pub(crate) fall: Real,
    pub(crate) undershoot: Real,
    pub(crate) recovery: Real,
}

impl ActionPotential {
    pub(crate) fn sample<R: Rng + ?Sized>(
        template: &json::ActionPotentialTemplate,
        start: Real,
        rng: &mut R,
    ) -> SimulatorResult<Self> {
        Ok(Self {
            start,
            amplitude: template.amplitude.sample(rng)?,
            rise: template.rise_ms.sample(rng)?.max(Real::EPSILON),
            fall: template.fall_ms.sample(rng)?.max(Real::EPSILON),
            undershoot: template.undershoot.sample(rng)?,
            recovery: template.recovery_ms.sample(rng)?.max(Real::EPSILON),
        })
    }

    /// Contribution to the membrane potential at `time` ms from the start of the sweep.
    /// Depolarises linearly to the peak, repolarises linearly through the resting
    /// level to the undershoot, then relaxes back exponentially.
    pub(crate) fn get_value_at(&self, time: Real) -> Real {
        let time = time - self.start;
        if time < 0.0 {
            Real::default()
        } else if time < self.rise {
            self.amplitude * time / self.rise
        } else if time < self.rise + self.fall {
            self.amplitude - (self.amplitude + self.undershoot) * (time - self.rise) / self.fall
        } else {
            -self.undershoot * Real::exp(-(time - self.rise - self.fall) / self.recovery)
        }
    }

    /// After this many ms from the start of the sweep the contribution is negligible.
    pub(crate) fn end(&self) -> Real {
        self.start + self.rise + self.fall + 10.0 * self.recovery
    }
}
