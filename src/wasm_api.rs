//! WASM API exports for JavaScript interop
//!
//! This module provides `#[wasm_bindgen]` exports for the trending page
//! scripts: series naming for the drag-and-drop builder, query encoding
//! and range interpretation. It is only compiled when targeting wasm32.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::prelude::*;

use crate::core::Axis;
use crate::naming::{SeriesNames, channel_path};
use crate::query::{Param, encode_params};
use crate::range::{Range, RangePreset, RangeToken};

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{context}: {err}"))
}

/// JavaScript-accessible path set for one plot
#[wasm_bindgen]
pub struct JsSeriesNames {
    names: SeriesNames,
}

#[wasm_bindgen]
impl JsSeriesNames {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsSeriesNames {
        JsSeriesNames {
            names: SeriesNames::new(),
        }
    }

    /// Add a channel given as a slash-delimited path
    ///
    /// # Arguments
    /// * `path` - Channel path, e.g. `site/subsystem/channel`
    /// * `key` - Data channel key
    /// * `axis` - `y1` or `y2`
    #[wasm_bindgen(js_name = addData)]
    pub fn add_data(&mut self, path: &str, key: &str, axis: &str) -> Result<(), JsValue> {
        let axis: Axis = axis.parse().map_err(|e| js_error("Invalid axis", e))?;
        self.names.add_data(channel_path::<&str>(path, &[]), key, axis);
        Ok(())
    }

    /// Add a channel from a tree node and its ancestors (root first)
    #[wasm_bindgen(js_name = addNode)]
    pub fn add_node(
        &mut self,
        text: &str,
        ancestors: Vec<String>,
        key: &str,
        axis: &str,
    ) -> Result<(), JsValue> {
        let axis: Axis = axis.parse().map_err(|e| js_error("Invalid axis", e))?;
        self.names.add_data(channel_path(text, &ancestors), key, axis);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.names.clear();
    }

    #[wasm_bindgen(getter)]
    pub fn title(&self) -> String {
        self.names.title().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn names(&self) -> Vec<String> {
        self.names.names().to_vec()
    }

    #[wasm_bindgen(js_name = trendingDataMarkup)]
    pub fn trending_data_markup(&self) -> String {
        self.names.trending_data_markup()
    }
}

impl Default for JsSeriesNames {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a JSON object as a bracket-notation query string
#[wasm_bindgen(js_name = encodeQuery)]
pub fn encode_query(json: &str) -> Result<String, JsValue> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| js_error("Failed to parse query JSON", e))?;
    match Param::from(value) {
        Param::Map(params) => Ok(encode_params(&params)),
        _ => Err(JsValue::from_str("Query parameters must be a JSON object")),
    }
}

/// Resolve a range token to `[start, end]` epoch milliseconds at `now`
#[wasm_bindgen(js_name = rangeWindow)]
pub fn range_window(token: &str, now: f64) -> Vec<f64> {
    let window = RangeToken::from(token).interpret().window(now as i64);
    vec![window.start as f64, window.end as f64]
}

/// Whether the token is a relative (auto-updating) range
#[wasm_bindgen(js_name = isRelativeRange)]
pub fn is_relative_range(token: &str) -> bool {
    matches!(RangeToken::from(token).interpret(), Range::Relative(_))
}

/// Preset label for the range selector, `custom` when none matches
#[wasm_bindgen(js_name = classifyRange)]
pub fn classify_range(token: &str) -> String {
    RangePreset::classify(&RangeToken::from(token))
        .label()
        .to_string()
}

/// Log a message to the browser console
#[wasm_bindgen]
pub fn log(msg: &str) {
    web_sys::console::log_1(&msg.into());
}
