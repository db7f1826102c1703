use serde::{Deserialize, Serialize};

use crate::equilibrium::{competition_outcome, equilibria, CompetitionOutcome, Equilibrium};
use crate::error::EngineError;
use crate::model::{CompetitionModel, InitialState, ParameterSet, DEFAULT_GROWTH_RATE};
use crate::simulate::{simulate, SimulationResult, TimeSpec};
use crate::zngi::{zngi_chart, ZngiChart};

/// Full configuration tuple for one request.
///
/// This mirrors the interactive surface: initial densities, carrying
/// capacities, competition coefficients and the time layout. Growth rates
/// are not part of the surface; runs use [`DEFAULT_GROWTH_RATE`] for both
/// species. Whole-tuple equality drives the [`Engine`] memoization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub n1: f64,
    pub n2: f64,
    pub k1: f64,
    pub k2: f64,
    pub alpha: f64,
    pub beta: f64,
    #[serde(flatten)]
    pub time: TimeSpec,
}

impl Config {
    /// Checks everything that must hold before any integration work starts.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("N1", self.n1),
            ("N2", self.n2),
            ("K1", self.k1),
            ("K2", self.k2),
            ("Alpha", self.alpha),
            ("Beta", self.beta),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.n1 <= 0.0 || self.n2 <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "initial populations must be positive, got N1={}, N2={}",
                self.n1, self.n2
            )));
        }
        if self.k1 <= 0.0 || self.k2 <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "carrying capacities must be positive, got K1={}, K2={}",
                self.k1, self.k2
            )));
        }
        if matches!(self.time, TimeSpec::Fixed { steps: 0 }) {
            return Err(EngineError::InvalidConfiguration(
                "fixed mode requires at least one step".into(),
            ));
        }
        Ok(())
    }
}

/// Everything one run hands to the rendering and export collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOutput {
    pub series: SimulationResult,
    pub chart: ZngiChart,
    pub equilibria: Vec<Equilibrium>,
    pub outcome: CompetitionOutcome,
    pub caption: String,
}

/// Runs one configuration from scratch: validation, integration, isocline
/// geometry, equilibrium context, caption.
pub fn run(config: &Config) -> Result<EngineOutput, EngineError> {
    config.validate()?;
    let params = ParameterSet::new(
        DEFAULT_GROWTH_RATE,
        DEFAULT_GROWTH_RATE,
        config.k1,
        config.k2,
        config.alpha,
        config.beta,
    )?;
    let model = CompetitionModel::new(params);
    let series = simulate(&model, InitialState::new(config.n1, config.n2), config.time)?;
    Ok(EngineOutput {
        series,
        chart: zngi_chart(&params),
        equilibria: equilibria(&params),
        outcome: competition_outcome(&params),
        caption: params.summary(),
    })
}

/// Request-driven facade with most-recent-result semantics: a single cached
/// run, invalidated wholesale by any change to the configuration tuple.
#[derive(Default)]
pub struct Engine {
    cache: Option<(Config, EngineOutput)>,
    computations: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the output for `config`, recomputing only when the tuple
    /// differs from the cached one. A failed run leaves the previous result
    /// in place.
    pub fn recompute(&mut self, config: Config) -> Result<&EngineOutput, EngineError> {
        let stale = match &self.cache {
            Some((cached, _)) => *cached != config,
            None => true,
        };
        if stale {
            let output = run(&config)?;
            self.cache = Some((config, output));
            self.computations += 1;
        }
        match &self.cache {
            Some((_, output)) => Ok(output),
            None => unreachable!("cache was just populated"),
        }
    }

    /// The most recent successful output, if any.
    pub fn last(&self) -> Option<&EngineOutput> {
        self.cache.as_ref().map(|(_, output)| output)
    }

    /// How many full recomputations this engine has performed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::SteadyStateDetector;

    fn config() -> Config {
        Config {
            n1: 10.0,
            n2: 20.0,
            k1: 500.0,
            k2: 400.0,
            alpha: 0.75,
            beta: 0.5,
            time: TimeSpec::Fixed { steps: 30 },
        }
    }

    #[test]
    fn fixed_run_produces_the_complete_output() {
        let output = run(&config()).unwrap();

        assert_eq!(output.series.len(), 31);
        assert_eq!(output.equilibria.len(), 4);
        assert_eq!(output.outcome, CompetitionOutcome::Coexistence);
        assert!((output.chart.bounds.n1_max - 1000.0).abs() < 1e-9);
        assert_eq!(
            output.caption,
            "K1=500, K2=400, r1=1, r2=1, Alpha=0.75, Beta=0.5"
        );
    }

    #[test]
    fn steady_state_run_ends_settled() {
        let mut cfg = config();
        cfg.k2 = 500.0;
        cfg.beta = 0.75;
        cfg.time = TimeSpec::SteadyState;
        let output = run(&cfg).unwrap();

        let params =
            ParameterSet::new(1.0, 1.0, cfg.k1, cfg.k2, cfg.alpha, cfg.beta).unwrap();
        let model = CompetitionModel::new(params);
        let detector = SteadyStateDetector::new(&model);
        let last = output.series.final_sample().unwrap();
        assert!(detector.margin(last.t, &[last.n1, last.n2]) <= 0.0);
    }

    #[test]
    fn validation_rejects_bad_tuples_before_integration() {
        let mut bad = config();
        bad.k1 = 0.0;
        let err = run(&bad).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("carrying capacities"));

        bad = config();
        bad.n2 = -1.0;
        assert!(run(&bad).is_err());

        bad = config();
        bad.alpha = f64::NAN;
        assert!(run(&bad).is_err());

        bad = config();
        bad.time = TimeSpec::Fixed { steps: 0 };
        assert!(run(&bad).is_err());
    }

    #[test]
    fn engine_runs_an_unchanged_tuple_only_once() {
        let mut engine = Engine::new();
        let first = engine.recompute(config()).unwrap().clone();
        let again = engine.recompute(config()).unwrap().clone();
        assert_eq!(engine.computations(), 1);
        assert_eq!(first, again);

        let mut changed = config();
        changed.alpha = 0.8;
        engine.recompute(changed).unwrap();
        assert_eq!(engine.computations(), 2);

        // Changing only the time layout also invalidates.
        changed.time = TimeSpec::SteadyState;
        engine.recompute(changed).unwrap();
        assert_eq!(engine.computations(), 3);
    }

    #[test]
    fn failed_request_keeps_the_previous_result() {
        let mut engine = Engine::new();
        engine.recompute(config()).unwrap();

        let mut bad = config();
        bad.n1 = 0.0;
        assert!(engine.recompute(bad).is_err());

        assert_eq!(engine.computations(), 1);
        let kept = engine.last().unwrap();
        assert_eq!(kept.series.len(), 31);
    }

    #[test]
    fn fresh_engine_has_no_result() {
        let engine = Engine::new();
        assert!(engine.last().is_none());
        assert_eq!(engine.computations(), 0);
    }
}
