//! WASM bindings for rushhour-core
//!
//! Lets a browser host the tracker directly: feed it inbound messages as
//! they arrive on the page's own socket and render the returned snapshots.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    dot, parse_configuration, starting_configuration, Configuration, InboundMessage,
    RevisitPolicy, SlideRules, Tracker, TrackerOptions,
};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}

/// WASM-friendly wrapper around a sliding-rules Tracker
#[wasm_bindgen]
pub struct WasmTracker {
    inner: Tracker<SlideRules>,
}

#[wasm_bindgen]
impl WasmTracker {
    /// Start a session on the reference starting board
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmTracker {
        WasmTracker::with_start(starting_configuration(), TrackerOptions::default())
    }

    /// Start a session from a JSON configuration (bare or `{cars: ...}`)
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(
        initial: &str,
        board_size: u16,
        revisit_edges: bool,
    ) -> Result<WasmTracker, JsValue> {
        let initial = parse_configuration(initial).map_err(|e| JsValue::from_str(&e.to_string()))?;
        initial
            .validate(board_size)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let revisit = if revisit_edges {
            RevisitPolicy::Record
        } else {
            RevisitPolicy::Skip
        };
        Ok(WasmTracker::with_start(
            initial,
            TrackerOptions {
                board_size,
                revisit,
            },
        ))
    }

    /// Apply an inbound message object (`{cars: {...}}`). Returns the outcome.
    pub fn observe(&mut self, message: JsValue) -> Result<JsValue, JsValue> {
        let message: InboundMessage = serde_wasm_bindgen::from_value(message)?;
        let outcome = self.inner.observe(message.cars);
        to_js(&outcome)
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.view().snapshot())
    }

    /// Current fingerprint
    pub fn fingerprint(&self) -> u32 {
        self.inner.state().fingerprint()
    }

    /// Pending illegal-move message, if any
    pub fn message(&self) -> Option<String> {
        self.inner.state().message().map(str::to_string)
    }

    /// Explored graph in Graphviz format
    #[wasm_bindgen(js_name = toDot)]
    pub fn to_dot(&self) -> String {
        dot::to_dot(&self.inner.view())
    }

    /// Start over from the initial configuration
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl WasmTracker {
    fn with_start(initial: Configuration, options: TrackerOptions) -> WasmTracker {
        let gate = SlideRules::new(options.board_size);
        WasmTracker {
            inner: Tracker::with_options(initial, gate, options),
        }
    }
}

impl Default for WasmTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint of a configuration object (`{red: [[0, 0], [0, 1]], ...}`)
#[wasm_bindgen(js_name = fingerprintOf)]
pub fn fingerprint_of(cars: JsValue) -> Result<u32, JsValue> {
    let config: Configuration = serde_wasm_bindgen::from_value(cars)?;
    Ok(config.fingerprint())
}
