//! Engine wrapper exposed to the browser frontend.

use gause_core::engine::{Config, Engine};
use gause_core::simulate::TimeSpec;
use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmEngine {
    pub(crate) engine: Engine,
}

/// Digest of the most recent run, for frontend status displays.
#[derive(Serialize)]
struct RunDigest {
    computations: usize,
    samples: usize,
    final_t: f64,
}

pub(crate) fn parse_mode(mode: &str, steps: u32) -> Option<TimeSpec> {
    match mode {
        "fixed" => Some(TimeSpec::Fixed { steps }),
        "steady_state" => Some(TimeSpec::SteadyState),
        _ => None,
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        console_error_panic_hook::set_once();
        WasmEngine {
            engine: Engine::new(),
        }
    }

    /// Runs (or re-serves) a configuration and returns the full output:
    /// series, isoclines, bounds, equilibria, outcome and caption.
    ///
    /// `steps` is ignored in `steady_state` mode.
    #[allow(clippy::too_many_arguments)]
    pub fn recompute(
        &mut self,
        n1: f64,
        n2: f64,
        k1: f64,
        k2: f64,
        alpha: f64,
        beta: f64,
        mode: &str,
        steps: u32,
    ) -> Result<JsValue, JsValue> {
        let time = parse_mode(mode, steps).ok_or_else(|| JsValue::from_str("Unknown mode"))?;
        let config = Config {
            n1,
            n2,
            k1,
            k2,
            alpha,
            beta,
            time,
        };
        let output = self
            .engine
            .recompute(config)
            .map_err(|e| JsValue::from_str(&format!("Simulation failed: {}", e)))?;
        to_value(output).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// The most recent series as flat `[t, n1, n2, ...]` triples.
    pub fn series(&self) -> Result<Float64Array, JsValue> {
        let output = self
            .engine
            .last()
            .ok_or_else(|| JsValue::from_str("No simulation has been run yet."))?;
        let mut flat = Vec::with_capacity(output.series.len() * 3);
        for sample in &output.series.samples {
            flat.push(sample.t);
            flat.push(sample.n1);
            flat.push(sample.n2);
        }
        Ok(Float64Array::from(flat.as_slice()))
    }

    /// The most recent series as `[t, n1, n2]` rows with densities truncated
    /// toward zero, the layout the tabular export uses.
    pub fn truncated_series(&self) -> Result<JsValue, JsValue> {
        let output = self
            .engine
            .last()
            .ok_or_else(|| JsValue::from_str("No simulation has been run yet."))?;
        let rows: Vec<[f64; 3]> = output
            .series
            .truncated()
            .into_iter()
            .map(|(t, n1, n2)| [t, n1 as f64, n2 as f64])
            .collect();
        to_value(&rows).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Parameter caption line for chart and export titles.
    pub fn caption(&self) -> Result<String, JsValue> {
        let output = self
            .engine
            .last()
            .ok_or_else(|| JsValue::from_str("No simulation has been run yet."))?;
        Ok(output.caption.clone())
    }

    pub fn sample_count(&self) -> usize {
        self.engine.last().map_or(0, |output| output.series.len())
    }

    pub fn digest(&self) -> Result<JsValue, JsValue> {
        let output = self
            .engine
            .last()
            .ok_or_else(|| JsValue::from_str("No simulation has been run yet."))?;
        let digest = RunDigest {
            computations: self.engine.computations(),
            samples: output.series.len(),
            final_t: output.series.final_sample().map_or(0.0, |s| s.t),
        };
        to_value(&digest).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::WasmEngine;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn recompute_rejects_unknown_mode() {
        let mut wrapper = WasmEngine::new();
        let result = wrapper.recompute(10.0, 20.0, 500.0, 400.0, 0.75, 0.5, "nope", 10);
        assert!(result.is_err(), "expected unknown mode error");
    }

    #[wasm_bindgen_test]
    fn series_is_flat_triples() {
        let mut wrapper = WasmEngine::new();
        wrapper
            .recompute(10.0, 20.0, 500.0, 400.0, 0.75, 0.5, "fixed", 30)
            .expect("run");

        let series = wrapper.series().expect("series");
        assert_eq!(series.length(), 31 * 3);
    }
}
