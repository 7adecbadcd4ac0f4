//! Per-launch kernel parameters.

use aurora_core::{Scalar, StepId};
use aurora_space::GridDescriptor;

/// Parameters every kernel launch can read.
///
/// Passed by value through the policy, replaced before each step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LaunchContext {
    /// Local grid of the launching rank.
    pub grid: GridDescriptor,
    /// Timestep.
    pub dt: Scalar,
    /// Step being computed.
    pub step: StepId,
}

impl LaunchContext {
    /// Context for `grid` with timestep `dt` at step zero.
    pub fn new(grid: GridDescriptor, dt: Scalar) -> Self {
        Self {
            grid,
            dt,
            step: StepId(0),
        }
    }

    /// Same context at `step`.
    pub fn at_step(self, step: StepId) -> Self {
        Self { step, ..self }
    }
}
