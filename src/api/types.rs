//! Shared types for the WASM API

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::session::RenderState;
use crate::sync::{SyncEffect, UnitLayout, ViewportProbe};

/// Result of one session step: effects to apply, in order, and the state
/// to render afterwards
#[derive(Serialize, Clone, Debug)]
pub struct StepResult {
    pub effects: Vec<SyncEffect>,
    pub state: RenderState,
}

#[wasm_bindgen]
extern "C" {
    /// Geometry provider implemented by the web component
    pub type JsViewport;

    #[wasm_bindgen(method, js_name = isUnitVisible)]
    fn js_is_unit_visible(this: &JsViewport, unit_id: &str) -> bool;

    /// Returns a `UnitLayout`-shaped object, or null when unknown
    #[wasm_bindgen(method, js_name = unitLayout)]
    fn js_unit_layout(this: &JsViewport, unit_id: &str) -> JsValue;
}

impl ViewportProbe for JsViewport {
    fn is_unit_visible(&self, unit_id: &str) -> bool {
        self.js_is_unit_visible(unit_id)
    }

    fn unit_layout(&self, unit_id: &str) -> Option<UnitLayout> {
        let value = self.js_unit_layout(unit_id);
        if value.is_null() || value.is_undefined() {
            return None;
        }
        super::helpers::deserialize(value, "unitLayout").ok()
    }
}
