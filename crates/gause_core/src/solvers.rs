use crate::traits::VectorField;

/// Tolerances and guards for adaptive stepping.
#[derive(Debug, Clone, Copy)]
pub struct StepControl {
    /// Relative tolerance on the local error estimate.
    pub rel_tol: f64,
    /// Absolute tolerance on the local error estimate.
    pub abs_tol: f64,
    /// Smallest step the controller may propose before the run is declared
    /// failed.
    pub min_step: f64,
    /// Largest step the controller may propose.
    pub max_step: f64,
    /// Combined budget of accepted and rejected attempts for one run,
    /// enforced by the drivers.
    pub max_attempts: usize,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 1e-9,
            min_step: 1e-13,
            max_step: f64::INFINITY,
            max_attempts: 100_000,
        }
    }
}

/// Outcome of one attempted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// `t` and `state` were advanced; `next` is the recommended size for the
    /// following attempt.
    Accepted { next: f64 },
    /// `t` and `state` are untouched; retry with a step no larger than
    /// `next`.
    Rejected { next: f64 },
}

const SAFETY: f64 = 0.9;
const SHRINK_FLOOR: f64 = 0.2;
const GROWTH_CAP: f64 = 5.0;

/// Tsitouras 5(4) embedded Runge-Kutta pair.
///
/// The fifth-order solution advances the state; the difference against the
/// embedded fourth-order solution gives the local error estimate that drives
/// step-size control. Stage buffers are owned by the struct so repeated
/// stepping does not allocate.
pub struct Tsit5 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    y_next: Vec<f64>,
    tmp: Vec<f64>,
}

impl Tsit5 {
    pub fn new(dimension: usize) -> Self {
        Self {
            k1: vec![0.0; dimension],
            k2: vec![0.0; dimension],
            k3: vec![0.0; dimension],
            k4: vec![0.0; dimension],
            k5: vec![0.0; dimension],
            k6: vec![0.0; dimension],
            k7: vec![0.0; dimension],
            y_next: vec![0.0; dimension],
            tmp: vec![0.0; dimension],
        }
    }

    /// Attempts a single step of size `dt`.
    ///
    /// On acceptance `t` and `state` are advanced in place; on rejection both
    /// are left untouched. Non-finite arithmetic anywhere in the stages is
    /// reported as a rejection with a shrunk step, so the caller's minimum
    /// step guard decides whether the run can continue.
    pub fn try_step(
        &mut self,
        field: &impl VectorField,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
        control: &StepControl,
    ) -> StepOutcome {
        let c2 = 0.161;
        let c3 = 0.327;
        let c4 = 0.9;
        let c5 = 0.9800255409045097;

        let a21 = 0.161;
        let a31 = -0.008480655492356989;
        let a32 = 0.335480655492357;
        let a41 = 2.8971530571054935;
        let a42 = -6.359448489975075;
        let a43 = 4.3622954328695815;
        let a51 = 5.325864828439257;
        let a52 = -11.748883564062828;
        let a53 = 7.4955393428898365;
        let a54 = -0.09249506636175525;
        let a61 = 5.86145544294642;
        let a62 = -12.92096931784711;
        let a63 = 8.159367898576159;
        let a64 = -0.071584973281401;
        let a65 = -0.028269050394068383;

        // Fifth-order weights (also the seventh stage row).
        let b1 = 0.09646076681806523;
        let b2 = 0.01;
        let b3 = 0.4798896504144996;
        let b4 = 1.379008574103742;
        let b5 = -3.290069515436081;
        let b6 = 2.324710524099774;

        // Difference between the fifth- and embedded fourth-order weights.
        let bt1 = -1.780011052226e-3;
        let bt2 = -8.164344596567e-4;
        let bt3 = 7.880878010262e-3;
        let bt4 = -1.447110071732629e-1;
        let bt5 = 5.823571654525552e-1;
        let bt6 = -4.580821059291869e-1;
        let bt7 = 1.0 / 66.0;

        let t0 = *t;
        let dim = state.len();

        field.eval(t0, state, &mut self.k1);

        for i in 0..dim {
            self.tmp[i] = state[i] + dt * a21 * self.k1[i];
        }
        field.eval(t0 + c2 * dt, &self.tmp, &mut self.k2);

        for i in 0..dim {
            self.tmp[i] = state[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        field.eval(t0 + c3 * dt, &self.tmp, &mut self.k3);

        for i in 0..dim {
            self.tmp[i] =
                state[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        field.eval(t0 + c4 * dt, &self.tmp, &mut self.k4);

        for i in 0..dim {
            self.tmp[i] = state[i]
                + dt * (a51 * self.k1[i]
                    + a52 * self.k2[i]
                    + a53 * self.k3[i]
                    + a54 * self.k4[i]);
        }
        field.eval(t0 + c5 * dt, &self.tmp, &mut self.k5);

        for i in 0..dim {
            self.tmp[i] = state[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        field.eval(t0 + dt, &self.tmp, &mut self.k6);

        for i in 0..dim {
            self.y_next[i] = state[i]
                + dt * (b1 * self.k1[i]
                    + b2 * self.k2[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }
        field.eval(t0 + dt, &self.y_next, &mut self.k7);

        let mut err_sq = 0.0;
        for i in 0..dim {
            let err = dt
                * (bt1 * self.k1[i]
                    + bt2 * self.k2[i]
                    + bt3 * self.k3[i]
                    + bt4 * self.k4[i]
                    + bt5 * self.k5[i]
                    + bt6 * self.k6[i]
                    + bt7 * self.k7[i]);
            let scale =
                control.abs_tol + control.rel_tol * state[i].abs().max(self.y_next[i].abs());
            let ratio = err / scale;
            err_sq += ratio * ratio;
        }
        let err_norm = (err_sq / dim as f64).sqrt();

        if !err_norm.is_finite() || self.y_next.iter().any(|v| !v.is_finite()) {
            return StepOutcome::Rejected {
                next: dt * SHRINK_FLOOR,
            };
        }

        // err_norm = 0 gives an infinite raw factor; the clamp turns that
        // into the growth cap.
        let raw_factor = SAFETY * err_norm.powf(-0.2);

        if err_norm <= 1.0 {
            state.copy_from_slice(&self.y_next);
            *t = t0 + dt;
            let factor = raw_factor.clamp(SHRINK_FLOOR, GROWTH_CAP);
            StepOutcome::Accepted {
                next: (dt * factor).min(control.max_step),
            }
        } else {
            let factor = raw_factor.clamp(SHRINK_FLOOR, 1.0);
            StepOutcome::Rejected { next: dt * factor }
        }
    }
}

/// Starting step heuristic in the style of Hairer, Norsett and Wanner: an
/// estimate from the ratio of state to derivative scale, refined by one
/// Euler probe. Degenerate signals fall back to a small conservative step.
pub fn initial_step_size(
    field: &impl VectorField,
    t0: f64,
    state: &[f64],
    control: &StepControl,
) -> f64 {
    let dim = state.len();
    let mut f0 = vec![0.0; dim];
    field.eval(t0, state, &mut f0);

    let scale: Vec<f64> = state
        .iter()
        .map(|y| control.abs_tol + control.rel_tol * y.abs())
        .collect();
    let d0 = scaled_rms(state, &scale);
    let d1 = scaled_rms(&f0, &scale);

    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let probe: Vec<f64> = state
        .iter()
        .zip(&f0)
        .map(|(y, f)| y + h0 * f)
        .collect();
    let mut f1 = vec![0.0; dim];
    field.eval(t0 + h0, &probe, &mut f1);

    let diff: Vec<f64> = f1.iter().zip(&f0).map(|(a, b)| a - b).collect();
    let d2 = scaled_rms(&diff, &scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(0.2)
    };

    let h = (100.0 * h0).min(h1).min(control.max_step);
    if h.is_finite() && h > 0.0 {
        h
    } else {
        1e-6
    }
}

fn scaled_rms(values: &[f64], scale: &[f64]) -> f64 {
    let sum: f64 = values
        .iter()
        .zip(scale)
        .map(|(v, s)| (v / s) * (v / s))
        .sum();
    (sum / values.len() as f64).sqrt()
}
