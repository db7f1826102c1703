use serde::{Deserialize, Serialize};

use crate::model::ParameterSet;

/// Factor applied to the largest finite intercept to give the plot a margin.
const BOUNDS_MARGIN: f64 = 1.25;

/// A point in the `(N1, N2)` phase plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhasePoint {
    pub n1: f64,
    pub n2: f64,
}

/// Phase-plane axis, used to orient unbounded isoclines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    N1,
    N2,
}

/// Zero net growth isocline of one species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Isocline {
    /// Both axis intercepts are finite; the isocline is the segment joining
    /// them.
    Segment { start: PhasePoint, end: PhasePoint },
    /// The competition coefficient is zero, so one intercept recedes to
    /// infinity. The isocline runs through `anchor`, parallel to
    /// `direction`.
    Unbounded { anchor: PhasePoint, direction: Axis },
}

/// Suggested plot extents for the phase-plane diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub n1_max: f64,
    pub n2_max: f64,
}

/// Isocline geometry handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZngiChart {
    pub species1: Isocline,
    pub species2: Isocline,
    pub bounds: AxisBounds,
}

/// Computes both species' isoclines and the suggested axis bounds.
///
/// Species 1 has zero net growth on `N1 + alpha * N2 = K1`, species 2 on
/// `N2 + beta * N1 = K2`. A zero coefficient yields an explicit unbounded
/// line instead of a divided-out endpoint, and its infinite intercept is
/// left out of the bounds.
pub fn zngi_chart(params: &ParameterSet) -> ZngiChart {
    let species1 = if params.alpha == 0.0 {
        Isocline::Unbounded {
            anchor: PhasePoint {
                n1: params.k1,
                n2: 0.0,
            },
            direction: Axis::N2,
        }
    } else {
        Isocline::Segment {
            start: PhasePoint {
                n1: params.k1,
                n2: 0.0,
            },
            end: PhasePoint {
                n1: 0.0,
                n2: params.k1 / params.alpha,
            },
        }
    };

    let species2 = if params.beta == 0.0 {
        Isocline::Unbounded {
            anchor: PhasePoint {
                n1: 0.0,
                n2: params.k2,
            },
            direction: Axis::N1,
        }
    } else {
        Isocline::Segment {
            start: PhasePoint {
                n1: params.k2 / params.beta,
                n2: 0.0,
            },
            end: PhasePoint {
                n1: 0.0,
                n2: params.k2,
            },
        }
    };

    let mut n1_max = params.k1;
    if params.beta != 0.0 {
        n1_max = n1_max.max(params.k2 / params.beta);
    }
    let mut n2_max = params.k2;
    if params.alpha != 0.0 {
        n2_max = n2_max.max(params.k1 / params.alpha);
    }

    ZngiChart {
        species1,
        species2,
        bounds: AxisBounds {
            n1_max: BOUNDS_MARGIN * n1_max,
            n2_max: BOUNDS_MARGIN * n2_max,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k1: f64, k2: f64, alpha: f64, beta: f64) -> ParameterSet {
        ParameterSet::new(1.0, 1.0, k1, k2, alpha, beta).unwrap()
    }

    #[test]
    fn isoclines_connect_the_axis_intercepts() {
        let chart = zngi_chart(&params(500.0, 400.0, 0.75, 0.5));

        match chart.species1 {
            Isocline::Segment { start, end } => {
                assert_eq!(start, PhasePoint { n1: 500.0, n2: 0.0 });
                assert_eq!(end.n1, 0.0);
                assert!((end.n2 - 500.0 / 0.75).abs() < 1e-9);
            }
            Isocline::Unbounded { .. } => panic!("nonzero alpha gives a segment"),
        }

        match chart.species2 {
            Isocline::Segment { start, end } => {
                assert!((start.n1 - 800.0).abs() < 1e-9);
                assert_eq!(start.n2, 0.0);
                assert_eq!(end, PhasePoint { n1: 0.0, n2: 400.0 });
            }
            Isocline::Unbounded { .. } => panic!("nonzero beta gives a segment"),
        }
    }

    #[test]
    fn symmetric_parameters_give_mirrored_isoclines() {
        let chart = zngi_chart(&params(500.0, 500.0, 0.75, 0.75));
        let off_axis = 500.0 / 0.75;

        match (chart.species1, chart.species2) {
            (
                Isocline::Segment { start: s1, end: e1 },
                Isocline::Segment { start: s2, end: e2 },
            ) => {
                assert_eq!(s1, PhasePoint { n1: 500.0, n2: 0.0 });
                assert!((e1.n2 - off_axis).abs() < 1e-9);
                assert!((s2.n1 - off_axis).abs() < 1e-9);
                assert_eq!(e2, PhasePoint { n1: 0.0, n2: 500.0 });
            }
            _ => panic!("nonzero coefficients give segments"),
        }
    }

    #[test]
    fn zero_coefficient_marks_the_isocline_unbounded() {
        let chart = zngi_chart(&params(500.0, 400.0, 0.0, 0.0));

        assert_eq!(
            chart.species1,
            Isocline::Unbounded {
                anchor: PhasePoint { n1: 500.0, n2: 0.0 },
                direction: Axis::N2,
            }
        );
        assert_eq!(
            chart.species2,
            Isocline::Unbounded {
                anchor: PhasePoint { n1: 0.0, n2: 400.0 },
                direction: Axis::N1,
            }
        );
    }

    #[test]
    fn bounds_scale_the_largest_intercept_per_axis() {
        let chart = zngi_chart(&params(500.0, 400.0, 0.75, 0.5));
        // N1 axis: max(500, 400 / 0.5) = 800; N2 axis: max(400, 500 / 0.75).
        assert!((chart.bounds.n1_max - 1000.0).abs() < 1e-9);
        assert!((chart.bounds.n2_max - 1.25 * (500.0 / 0.75)).abs() < 1e-9);
    }

    #[test]
    fn bounds_skip_infinite_intercepts() {
        let chart = zngi_chart(&params(500.0, 400.0, 0.75, 0.0));
        // Species 2's isocline never crosses the N1 axis, so only K1 counts.
        assert!((chart.bounds.n1_max - 625.0).abs() < 1e-9);
    }
}
