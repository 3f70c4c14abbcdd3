//! Read-along WASM API
//!
//! JavaScript-facing surface of the engine. The web component owns the DOM
//! and the audio element; it forwards user and transport events here and
//! applies the returned effects in order.
//!
//! # Module Structure
//!
//! - `helpers`: serialization, logging macros and error conversion
//! - `types`: step results and the `JsViewport` geometry import
//! - `core`: the session-backed API functions

pub mod helpers;
pub mod types;
pub mod core;

pub use core::*;
pub use types::{JsViewport, StepResult};
