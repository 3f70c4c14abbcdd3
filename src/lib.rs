//! Read-along WASM Module
//!
//! Synchronizes a time-aligned audio recording with a structured text: the
//! word being read is highlighted and kept in view, and alignment anchors
//! can be edited and exported as a corrected alignment document.

pub mod errors;
pub mod config;
pub mod i18n;
pub mod models;
pub mod parse;
pub mod sync;
pub mod anchors;
pub mod session;
pub mod api;

// Re-export commonly used types
pub use config::{PageScrolling, ReadAlongConfig};
pub use errors::{AnchorEditError, ExportError, LoadFailure, ParseError};
pub use models::*;
pub use session::{ReadAlongSession, RenderState};
pub use sync::{SyncEffect, TransportCommand, ViewportProbe};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Debug);

    log::info!("Read-along WASM module initialized");
}
