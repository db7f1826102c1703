//! WASM bridge exposing the Gause competition engine to the browser.

pub mod engine;

pub use engine::WasmEngine;
