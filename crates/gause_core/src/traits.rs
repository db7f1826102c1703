/// A continuous-time vector field over a flat state vector.
///
/// This is the seam between models and solvers: the model exposes its
/// right-hand side, the stepper drives it without knowing the equations.
pub trait VectorField {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the field at (`t`, `state`), writing d(state)/dt into `out`.
    ///
    /// `state` and `out` must both have length [`Self::dimension`].
    fn eval(&self, t: f64, state: &[f64], out: &mut [f64]);
}
