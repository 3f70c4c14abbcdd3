//! Shared helpers for the read-along WASM API
//!
//! Console output, the serde bridge to JS values, and conversions of JS
//! numbers and errors.

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = debug)]
    fn console_debug(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = info)]
    fn console_info(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(s: &str);
}

/// Console severity for API-boundary messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    fn prefix(self) -> &'static str {
        match self {
            ConsoleLevel::Debug | ConsoleLevel::Info => "[WASM]",
            ConsoleLevel::Warn => "[WASM] ⚠️",
            ConsoleLevel::Error => "[WASM] ❌",
        }
    }
}

/// Write one prefixed line to the browser console. Called by the macros.
pub fn console_write(level: ConsoleLevel, msg: &str) {
    let line = format!("{} {}", level.prefix(), msg);
    match level {
        ConsoleLevel::Debug => console_debug(&line),
        ConsoleLevel::Info => console_info(&line),
        ConsoleLevel::Warn => console_warn(&line),
        ConsoleLevel::Error => console_error(&line),
    }
}

/// Debug line with [WASM] prefix
#[macro_export]
macro_rules! wasm_log {
    ($($arg:tt)*) => {
        $crate::api::helpers::console_write($crate::api::helpers::ConsoleLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! wasm_info {
    ($($arg:tt)*) => {
        $crate::api::helpers::console_write($crate::api::helpers::ConsoleLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! wasm_warn {
    ($($arg:tt)*) => {
        $crate::api::helpers::console_write($crate::api::helpers::ConsoleLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! wasm_error {
    ($($arg:tt)*) => {
        $crate::api::helpers::console_write($crate::api::helpers::ConsoleLevel::Error, &format!($($arg)*))
    };
}

/// Decode a JS value, reporting failures under `context`
pub fn deserialize<T: DeserializeOwned>(value: JsValue, context: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error(format!("{}: {}", context, e)))
}

/// Encode a value for JS, reporting failures under `context`
pub fn serialize<T: Serialize>(value: &T, context: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| js_error(format!("{}: {}", context, e)))
}

/// Error value for JS, logged to the console
pub fn js_error(msg: impl Into<String>) -> JsValue {
    let msg = msg.into();
    crate::wasm_error!("{}", msg);
    JsValue::from_str(&msg)
}

/// Milliseconds from a JS number. Negative and non-finite values become 0.
pub fn ms_from_js(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
