use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::traits::VectorField;

/// Growth rate used when the configuration surface does not carry one.
pub const DEFAULT_GROWTH_RATE: f64 = 1.0;

/// Biological parameters of the two-species competition model.
///
/// Carrying capacities must be strictly positive so the isocline intercepts
/// stay meaningful; [`ParameterSet::new`] enforces this. Competition
/// coefficients may be any finite value, including zero (no interaction).
/// The engine treats a constructed set as immutable and builds a fresh one
/// per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Intrinsic growth rate of species 1.
    pub r1: f64,
    /// Intrinsic growth rate of species 2.
    pub r2: f64,
    /// Carrying capacity of species 1.
    pub k1: f64,
    /// Carrying capacity of species 2.
    pub k2: f64,
    /// Per-capita effect of species 2 on species 1.
    pub alpha: f64,
    /// Per-capita effect of species 1 on species 2.
    pub beta: f64,
}

impl ParameterSet {
    pub fn new(
        r1: f64,
        r2: f64,
        k1: f64,
        k2: f64,
        alpha: f64,
        beta: f64,
    ) -> Result<Self, EngineError> {
        for (name, value) in [
            ("r1", r1),
            ("r2", r2),
            ("K1", k1),
            ("K2", k2),
            ("Alpha", alpha),
            ("Beta", beta),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if k1 <= 0.0 || k2 <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "carrying capacities must be positive, got K1={k1}, K2={k2}"
            )));
        }
        Ok(Self {
            r1,
            r2,
            k1,
            k2,
            alpha,
            beta,
        })
    }

    /// Single-line parameter caption, consumed verbatim by export surfaces.
    pub fn summary(&self) -> String {
        format!(
            "K1={}, K2={}, r1={}, r2={}, Alpha={}, Beta={}",
            self.k1, self.k2, self.r1, self.r2, self.alpha, self.beta
        )
    }
}

/// Initial population densities for one run.
///
/// No bounds are imposed here. The configuration boundary rejects
/// non-positive starts before they reach the integrator; callers driving the
/// model directly get the unclamped dynamics, whatever they are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub n1: f64,
    pub n2: f64,
}

impl InitialState {
    pub fn new(n1: f64, n2: f64) -> Self {
        Self { n1, n2 }
    }
}

/// The Lotka-Volterra competition vector field over state `[N1, N2]`:
///
/// ```text
/// dN1/dt = r1 * N1 * (1 - (N1 + alpha * N2) / K1)
/// dN2/dt = r2 * N2 * (1 - (N2 + beta * N1) / K2)
/// ```
///
/// Evaluation is pure and unclamped. Negative or diverging populations are
/// properties of the trajectory, not conditions this layer hides.
#[derive(Debug, Clone, Copy)]
pub struct CompetitionModel {
    pub params: ParameterSet,
}

impl CompetitionModel {
    pub fn new(params: ParameterSet) -> Self {
        Self { params }
    }

    /// Analytic Jacobian of the field at `state = [N1, N2]`.
    pub fn jacobian(&self, state: &[f64]) -> Matrix2<f64> {
        let p = &self.params;
        let (n1, n2) = (state[0], state[1]);
        Matrix2::new(
            p.r1 * (1.0 - (2.0 * n1 + p.alpha * n2) / p.k1),
            -p.r1 * n1 * p.alpha / p.k1,
            -p.r2 * n2 * p.beta / p.k2,
            p.r2 * (1.0 - (2.0 * n2 + p.beta * n1) / p.k2),
        )
    }
}

impl VectorField for CompetitionModel {
    fn dimension(&self) -> usize {
        2
    }

    fn eval(&self, _t: f64, state: &[f64], out: &mut [f64]) {
        let p = &self.params;
        let (n1, n2) = (state[0], state[1]);
        out[0] = p.r1 * n1 * (1.0 - (n1 + p.alpha * n2) / p.k1);
        out[1] = p.r2 * n2 * (1.0 - (n2 + p.beta * n1) / p.k2);
    }
}
