//! Numerical integration methods
//!
//! Forward Euler for the single-integrator vehicle model
//! `ṗ = v`, `p⁺ = p + dt·v`. The same step is applied to numeric
//! (`Vector3<f64>`) and symbolic ([`SymVec3`]) positions through
//! [`EulerIntegrable`], so a numeric rollout reproduces the symbolic one.

use nalgebra::Vector3;

use crate::symbolic::SymVec3;

/// States that can be advanced by one explicit Euler step
pub trait EulerIntegrable {
    /// `self += dt * rate`
    fn euler_step(&mut self, rate: &Self, dt: f64);
}

impl EulerIntegrable for Vector3<f64> {
    fn euler_step(&mut self, rate: &Self, dt: f64) {
        *self += rate * dt;
    }
}

impl EulerIntegrable for SymVec3 {
    fn euler_step(&mut self, rate: &Self, dt: f64) {
        self.axpy(dt, rate);
    }
}

/// Integrate a piecewise-constant rate sequence from `x0`
///
/// # Arguments
/// * `x0` - Initial state
/// * `rates` - Rate held over each step
/// * `dt` - Step length
///
/// # Returns
/// `rates.len() + 1` states, the first being `x0`
pub fn integrate_euler<S>(x0: &S, rates: &[S], dt: f64) -> Vec<S>
where
    S: EulerIntegrable + Clone,
{
    let mut states = Vec::with_capacity(rates.len() + 1);
    let mut x = x0.clone();
    states.push(x.clone());
    for rate in rates {
        x.euler_step(rate, dt);
        states.push(x.clone());
    }
    states
}
