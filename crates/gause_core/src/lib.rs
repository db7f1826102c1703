//! The `gause_core` crate is the numerical engine behind the Gause
//! competition explorer: two species under coupled logistic growth, plus the
//! phase-plane geometry used to read the outcome.
//!
//! Key components:
//! - **Traits**: `VectorField`, the seam between models and solvers.
//! - **Model**: validated parameters and the competition vector field.
//! - **Solvers**: adaptive Tsitouras 5(4) stepping with error control.
//! - **Simulate**: fixed-lattice and run-to-steady-state drivers.
//! - **Zngi / Equilibrium**: isoclines, axis bounds, fixed points and the
//!   competition outcome.
//! - **Engine**: the configuration surface and memoized recompute facade.

pub mod engine;
pub mod equilibrium;
pub mod error;
pub mod model;
pub mod simulate;
pub mod solvers;
pub mod traits;
pub mod zngi;
