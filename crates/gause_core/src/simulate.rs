use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{CompetitionModel, InitialState};
use crate::solvers::{initial_step_size, StepControl, StepOutcome, Tsit5};
use crate::traits::VectorField;

/// Horizon for steady-state runs. Integration never continues past this
/// time, detector or not.
pub const STEADY_STATE_HORIZON: f64 = 1000.0;

/// Threshold on the summed rate magnitudes below which the system counts as
/// settled. Not exposed as configuration.
pub const STEADY_STATE_TOLERANCE: f64 = 1e-3;

/// How the time axis of a run is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeSpec {
    /// Sample on the integer lattice `0..=steps`, with no early exit.
    Fixed { steps: u32 },
    /// Run until the settling detector fires, capped at
    /// [`STEADY_STATE_HORIZON`].
    SteadyState,
}

/// One `(t, N1, N2)` sample of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub n1: f64,
    pub n2: f64,
}

impl Sample {
    /// Densities truncated toward zero for integer display: 3.99 reads as 3,
    /// -0.5 reads as 0.
    pub fn truncated(&self) -> (i64, i64) {
        (self.n1.trunc() as i64, self.n2.trunc() as i64)
    }
}

/// Time series of one run. `samples` is strictly increasing in `t` by
/// construction and always starts at `t = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub samples: Vec<Sample>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn final_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// The series as `(t, N1, N2)` rows with densities truncated toward
    /// zero, the layout tabular exports use.
    pub fn truncated(&self) -> Vec<(f64, i64, i64)> {
        self.samples
            .iter()
            .map(|s| {
                let (n1, n2) = s.truncated();
                (s.t, n1, n2)
            })
            .collect()
    }
}

/// Scalar stop rule for steady-state runs.
///
/// The margin is `|dN1/dt| + |dN2/dt| - tolerance`; the detector fires once
/// the margin reaches zero or below. This is an approximate settling test on
/// the rates, not an exact root of the derivative, and it is consulted only
/// at accepted steps.
pub struct SteadyStateDetector<'a> {
    model: &'a CompetitionModel,
}

impl<'a> SteadyStateDetector<'a> {
    pub fn new(model: &'a CompetitionModel) -> Self {
        Self { model }
    }

    pub fn margin(&self, t: f64, state: &[f64]) -> f64 {
        let mut rates = [0.0; 2];
        self.model.eval(t, state, &mut rates);
        rates[0].abs() + rates[1].abs() - STEADY_STATE_TOLERANCE
    }

    pub fn triggered(&self, t: f64, state: &[f64]) -> bool {
        self.margin(t, state) <= 0.0
    }
}

/// Integrates the competition model under the requested time layout.
pub fn simulate(
    model: &CompetitionModel,
    initial: InitialState,
    spec: TimeSpec,
) -> Result<SimulationResult, EngineError> {
    match spec {
        TimeSpec::Fixed { steps } => run_fixed(model, initial, steps),
        TimeSpec::SteadyState => run_until_steady(model, initial),
    }
}

fn run_fixed(
    model: &CompetitionModel,
    initial: InitialState,
    steps: u32,
) -> Result<SimulationResult, EngineError> {
    if steps == 0 {
        return Err(EngineError::InvalidConfiguration(
            "fixed mode requires at least one step".into(),
        ));
    }

    let control = StepControl::default();
    let mut solver = Tsit5::new(model.dimension());
    let mut state = [initial.n1, initial.n2];
    let mut t = 0.0;
    let mut dt = initial_step_size(model, t, &state, &control);
    let mut attempts = 0usize;

    // Runs needing more samples than the attempt budget never complete, so
    // the budget caps the preallocation too.
    let mut samples = Vec::with_capacity((steps as usize).min(control.max_attempts) + 1);
    samples.push(Sample {
        t,
        n1: state[0],
        n2: state[1],
    });

    for target in 1..=steps {
        advance_to(
            model,
            &mut solver,
            &control,
            &mut t,
            &mut state,
            &mut dt,
            f64::from(target),
            &mut attempts,
        )?;
        samples.push(Sample {
            t,
            n1: state[0],
            n2: state[1],
        });
    }

    Ok(SimulationResult { samples })
}

fn run_until_steady(
    model: &CompetitionModel,
    initial: InitialState,
) -> Result<SimulationResult, EngineError> {
    let control = StepControl::default();
    let mut solver = Tsit5::new(model.dimension());
    let detector = SteadyStateDetector::new(model);
    let mut state = [initial.n1, initial.n2];
    let mut t = 0.0;
    let mut dt = initial_step_size(model, t, &state, &control);
    let mut attempts = 0usize;

    let mut samples = vec![Sample {
        t,
        n1: state[0],
        n2: state[1],
    }];

    while t < STEADY_STATE_HORIZON {
        attempts += 1;
        if attempts > control.max_attempts {
            return Err(excess_work(t, control.max_attempts));
        }

        let remaining = STEADY_STATE_HORIZON - t;
        let landing = dt * 1.1 >= remaining;
        let h = if landing { remaining } else { dt };

        match solver.try_step(model, &mut t, &mut state, h, &control) {
            StepOutcome::Accepted { next } => {
                dt = next;
                if landing {
                    t = STEADY_STATE_HORIZON;
                }
                samples.push(Sample {
                    t,
                    n1: state[0],
                    n2: state[1],
                });
                if detector.triggered(t, &state) {
                    break;
                }
            }
            StepOutcome::Rejected { next } => {
                if next < control.min_step {
                    return Err(below_min_step(t, next, control.min_step));
                }
                dt = next;
            }
        }
    }

    Ok(SimulationResult { samples })
}

/// Advances `t` to exactly `target`, taking as many controlled steps as the
/// tolerances demand. A step that would end within 10% of the target is
/// stretched to land on it, so lattice points carry no rounding residue.
#[allow(clippy::too_many_arguments)]
fn advance_to(
    field: &impl VectorField,
    solver: &mut Tsit5,
    control: &StepControl,
    t: &mut f64,
    state: &mut [f64],
    dt: &mut f64,
    target: f64,
    attempts: &mut usize,
) -> Result<(), EngineError> {
    while *t < target {
        *attempts += 1;
        if *attempts > control.max_attempts {
            return Err(excess_work(*t, control.max_attempts));
        }

        let remaining = target - *t;
        let landing = *dt * 1.1 >= remaining;
        let h = if landing { remaining } else { *dt };

        match solver.try_step(field, t, state, h, control) {
            StepOutcome::Accepted { next } => {
                *dt = next;
                if landing {
                    *t = target;
                }
            }
            StepOutcome::Rejected { next } => {
                if next < control.min_step {
                    return Err(below_min_step(*t, next, control.min_step));
                }
                *dt = next;
            }
        }
    }
    Ok(())
}

fn excess_work(t: f64, budget: usize) -> EngineError {
    EngineError::IntegrationFailure {
        t,
        reason: format!("exceeded {budget} step attempts"),
    }
}

fn below_min_step(t: f64, proposed: f64, min_step: f64) -> EngineError {
    EngineError::IntegrationFailure {
        t,
        reason: format!("step size {proposed:.3e} fell below the minimum {min_step:.3e}"),
    }
}
