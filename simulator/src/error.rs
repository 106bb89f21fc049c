use sweeplab_common::Real;
use thiserror::Error;

pub(crate) type SimulatorResult<T> = Result<T, SimulatorError>;

#[derive(Debug, Error)]
pub(crate) enum SimulatorError {
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] rand_distr::NormalError),
    #[error("Invalid Exponential Distribution: {0}")]
    ExpDistribution(#[from] rand_distr::ExpError),
    #[error("Invalid Interval: min {min} must be less than max {max}")]
    InvalidInterval { min: Real, max: Real },
    #[error("Invalid Simulation: {0}")]
    InvalidSimulation(&'static str),
}
