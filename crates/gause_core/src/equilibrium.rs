use nalgebra::{Matrix2, Vector2};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::model::{CompetitionModel, ParameterSet};
use crate::zngi::PhasePoint;

/// Eigenvalue real parts inside this band count as zero.
const REAL_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// Which fixed point of the competition system an [`Equilibrium`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquilibriumKind {
    /// Both species extinct.
    Origin,
    /// Species 1 at its carrying capacity, species 2 extinct.
    Species1Only,
    /// Species 2 at its carrying capacity, species 1 extinct.
    Species2Only,
    /// Both species at positive density.
    Coexistence,
}

/// Linear stability class, read off the Jacobian eigenvalues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable,
    Saddle,
    /// At least one eigenvalue sits on the imaginary axis; the
    /// linearization does not decide.
    Marginal,
}

/// A fixed point together with its linearization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub state: PhasePoint,
    pub kind: EquilibriumKind,
    pub eigenvalues: [ComplexNumber; 2],
    pub stability: Stability,
}

/// Long-run fate of the competition, classified by the invasion criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionOutcome {
    /// Species 1 excludes species 2 from any positive start.
    Species1Wins,
    /// Species 2 excludes species 1 from any positive start.
    Species2Wins,
    /// The interior point attracts; both species persist.
    Coexistence,
    /// Both single-species states attract; the winner depends on the start.
    Bistability,
    /// An invasion criterion is exactly balanced; the portrait is
    /// structurally unstable.
    Degenerate,
}

/// Interior equilibrium solving `N1 + alpha * N2 = K1`,
/// `beta * N1 + N2 = K2`.
///
/// Unique whenever `alpha * beta != 1`; `None` in the singular case. The
/// solution is returned whatever its sign, feasibility is the caller's
/// concern.
pub fn interior_equilibrium(params: &ParameterSet) -> Option<PhasePoint> {
    let coefficients = Matrix2::new(1.0, params.alpha, params.beta, 1.0);
    let rhs = Vector2::new(params.k1, params.k2);
    coefficients
        .lu()
        .solve(&rhs)
        .map(|v| PhasePoint { n1: v[0], n2: v[1] })
}

/// All biologically visible equilibria with their linear stability.
///
/// The three boundary fixed points always exist. The interior point is
/// listed only when it lies strictly inside the positive quadrant.
pub fn equilibria(params: &ParameterSet) -> Vec<Equilibrium> {
    let model = CompetitionModel::new(*params);
    let mut points = vec![
        (PhasePoint { n1: 0.0, n2: 0.0 }, EquilibriumKind::Origin),
        (
            PhasePoint {
                n1: params.k1,
                n2: 0.0,
            },
            EquilibriumKind::Species1Only,
        ),
        (
            PhasePoint {
                n1: 0.0,
                n2: params.k2,
            },
            EquilibriumKind::Species2Only,
        ),
    ];
    if let Some(interior) = interior_equilibrium(params) {
        if interior.n1 > 0.0 && interior.n2 > 0.0 {
            points.push((interior, EquilibriumKind::Coexistence));
        }
    }

    points
        .into_iter()
        .map(|(state, kind)| classify(&model, state, kind))
        .collect()
}

fn classify(model: &CompetitionModel, state: PhasePoint, kind: EquilibriumKind) -> Equilibrium {
    let jacobian = model.jacobian(&[state.n1, state.n2]);
    let raw = jacobian.complex_eigenvalues();
    let stability = stability_of(&[raw[0], raw[1]]);
    Equilibrium {
        state,
        kind,
        eigenvalues: [raw[0].into(), raw[1].into()],
        stability,
    }
}

fn stability_of(eigenvalues: &[Complex<f64>; 2]) -> Stability {
    let negative = eigenvalues.iter().filter(|l| l.re < -REAL_EPS).count();
    let positive = eigenvalues.iter().filter(|l| l.re > REAL_EPS).count();
    if negative + positive < eigenvalues.len() {
        Stability::Marginal
    } else if negative == eigenvalues.len() {
        Stability::Stable
    } else if positive == eigenvalues.len() {
        Stability::Unstable
    } else {
        Stability::Saddle
    }
}

/// Classifies the long-run outcome by whether each species can invade the
/// other's single-species equilibrium: species 1 invades iff
/// `K1 > alpha * K2`, species 2 iff `K2 > beta * K1`.
pub fn competition_outcome(params: &ParameterSet) -> CompetitionOutcome {
    let invasion1 = params.k1 - params.alpha * params.k2;
    let invasion2 = params.k2 - params.beta * params.k1;
    if invasion1 == 0.0 || invasion2 == 0.0 {
        return CompetitionOutcome::Degenerate;
    }
    match (invasion1 > 0.0, invasion2 > 0.0) {
        (true, true) => CompetitionOutcome::Coexistence,
        (true, false) => CompetitionOutcome::Species1Wins,
        (false, true) => CompetitionOutcome::Species2Wins,
        (false, false) => CompetitionOutcome::Bistability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::VectorField;

    fn params(k1: f64, k2: f64, alpha: f64, beta: f64) -> ParameterSet {
        ParameterSet::new(1.0, 1.0, k1, k2, alpha, beta).unwrap()
    }

    fn find(kind: EquilibriumKind, all: &[Equilibrium]) -> &Equilibrium {
        all.iter()
            .find(|e| e.kind == kind)
            .unwrap_or_else(|| panic!("missing {kind:?}"))
    }

    #[test]
    fn interior_matches_the_closed_form() {
        let p = params(500.0, 400.0, 0.5, 0.6);
        let interior = interior_equilibrium(&p).unwrap();
        // (K1 - alpha K2) / (1 - alpha beta) and its mirror image.
        assert!((interior.n1 - 300.0 / 0.7).abs() < 1e-9);
        assert!((interior.n2 - 100.0 / 0.7).abs() < 1e-9);

        let model = CompetitionModel::new(p);
        let mut rates = [0.0; 2];
        model.eval(0.0, &[interior.n1, interior.n2], &mut rates);
        assert!(rates[0].abs() < 1e-9);
        assert!(rates[1].abs() < 1e-9);
    }

    #[test]
    fn interior_is_absent_when_isoclines_are_parallel() {
        assert!(interior_equilibrium(&params(500.0, 400.0, 0.5, 2.0)).is_none());
    }

    #[test]
    fn weak_competition_yields_a_stable_interior() {
        let p = params(500.0, 500.0, 0.75, 0.75);
        let all = equilibria(&p);
        assert_eq!(all.len(), 4);

        let interior = find(EquilibriumKind::Coexistence, &all);
        assert!((interior.state.n1 - 500.0 / 1.75).abs() < 1e-9);
        assert_eq!(interior.stability, Stability::Stable);
        assert!(interior.eigenvalues.iter().all(|l| l.re < 0.0));

        assert_eq!(competition_outcome(&p), CompetitionOutcome::Coexistence);
    }

    #[test]
    fn strong_competition_yields_a_saddle_interior() {
        let p = params(500.0, 500.0, 1.5, 1.5);
        let all = equilibria(&p);

        let interior = find(EquilibriumKind::Coexistence, &all);
        assert!((interior.state.n1 - 200.0).abs() < 1e-9);
        assert_eq!(interior.stability, Stability::Saddle);

        assert_eq!(find(EquilibriumKind::Species1Only, &all).stability, Stability::Stable);
        assert_eq!(find(EquilibriumKind::Species2Only, &all).stability, Stability::Stable);
        assert_eq!(competition_outcome(&p), CompetitionOutcome::Bistability);
    }

    #[test]
    fn exclusion_drops_the_interior_point() {
        let p = params(600.0, 300.0, 0.25, 1.0);
        let all = equilibria(&p);
        // The would-be interior sits at N2 = -400, outside the quadrant.
        assert_eq!(all.len(), 3);

        assert_eq!(find(EquilibriumKind::Origin, &all).stability, Stability::Unstable);
        assert_eq!(find(EquilibriumKind::Species1Only, &all).stability, Stability::Stable);
        assert_eq!(find(EquilibriumKind::Species2Only, &all).stability, Stability::Saddle);
        assert_eq!(competition_outcome(&p), CompetitionOutcome::Species1Wins);

        let mirrored = params(300.0, 600.0, 1.0, 0.25);
        assert_eq!(competition_outcome(&mirrored), CompetitionOutcome::Species2Wins);
    }

    #[test]
    fn balanced_invasion_is_degenerate_and_marginal() {
        // K1 = alpha * K2 puts a zero eigenvalue at the species 2 corner.
        let p = params(200.0, 400.0, 0.5, 0.1);
        assert_eq!(competition_outcome(&p), CompetitionOutcome::Degenerate);

        let all = equilibria(&p);
        assert_eq!(find(EquilibriumKind::Species2Only, &all).stability, Stability::Marginal);
    }

    #[test]
    fn boundary_eigenvalues_match_hand_computation() {
        let p = params(600.0, 300.0, 0.25, 1.0);
        let all = equilibria(&p);

        // At (K1, 0) the Jacobian is triangular with entries -r1 and
        // r2 (1 - beta K1 / K2) = -1.
        let corner = find(EquilibriumKind::Species1Only, &all);
        let mut res: Vec<f64> = corner.eigenvalues.iter().map(|l| l.re).collect();
        res.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((res[0] + 1.0).abs() < 1e-9);
        assert!((res[1] + 1.0).abs() < 1e-9);
        assert!(corner.eigenvalues.iter().all(|l| l.im.abs() < 1e-9));
    }
}
