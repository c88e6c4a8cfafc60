use wasm_bindgen::prelude::*;

use crate::options::BuildOptions;

/// Compile glyph JSON to a binary font. `options_json` may be empty.
#[wasm_bindgen]
pub fn compile_font(font_json: &str, options_json: &str) -> Result<Vec<u8>, JsValue> {
    let options = if options_json.trim().is_empty() {
        BuildOptions::default()
    } else {
        serde_json::from_str(options_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
    };
    crate::compile_json(font_json, &options).map_err(|e| JsValue::from_str(&e.to_string()))
}
