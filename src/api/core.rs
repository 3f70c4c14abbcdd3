//! WASM API for the read-along session
//!
//! The session lives in WASM-owned storage and is the single source of
//! truth. Every call takes the lock for its whole duration, so clock ticks
//! are serialized against seeks and anchor edits.

use once_cell::sync::Lazy;
use std::sync::Mutex;
use wasm_bindgen::prelude::*;

use super::helpers::{js_error, ms_from_js, serialize};
use super::types::{JsViewport, StepResult};
use crate::config::ReadAlongConfig;
use crate::i18n::translate;
use crate::models::Placement;
use crate::session::ReadAlongSession;
use crate::sync::SyncEffect;
use crate::{wasm_info, wasm_log, wasm_warn};

static SESSION: Lazy<Mutex<Option<ReadAlongSession>>> = Lazy::new(|| Mutex::new(None));

fn with_session<T>(f: impl FnOnce(&mut ReadAlongSession) -> T) -> Result<T, JsValue> {
    let mut guard = SESSION
        .lock()
        .map_err(|_| js_error("Session storage is poisoned"))?;
    let session = guard
        .as_mut()
        .ok_or_else(|| js_error("No session initialized"))?;
    Ok(f(session))
}

/// Run a step and return its effects together with the new render state
fn step(
    context: &str,
    f: impl FnOnce(&mut ReadAlongSession) -> Vec<SyncEffect>,
) -> Result<JsValue, JsValue> {
    let result = with_session(|session| {
        let effects = f(session);
        StepResult {
            effects,
            state: session.render_state(),
        }
    })?;
    serialize(&result, context)
}

// ============================================================================
// Session lifecycle and loading
// ============================================================================

/// Create a fresh session from a JSON configuration (empty string for defaults)
#[wasm_bindgen(js_name = initSession)]
pub fn init_session(config_json: &str) -> Result<(), JsValue> {
    let config = ReadAlongConfig::from_json(config_json).map_err(|e| js_error(e.to_string()))?;
    wasm_info!(
        "initSession: language={:?} editable={}",
        config.language,
        config.editable
    );
    let mut guard = SESSION
        .lock()
        .map_err(|_| js_error("Session storage is poisoned"))?;
    *guard = Some(ReadAlongSession::new(config));
    Ok(())
}

#[wasm_bindgen(js_name = loadText)]
pub fn load_text(source: &str) -> Result<JsValue, JsValue> {
    wasm_info!("loadText: {} bytes", source.len());
    step("loadText", |session| {
        if let Err(e) = session.load_text(source) {
            wasm_warn!("{}", e);
        }
        Vec::new()
    })
}

#[wasm_bindgen(js_name = textFetchFailed)]
pub fn text_fetch_failed(reason: &str) -> Result<JsValue, JsValue> {
    step("textFetchFailed", |session| {
        session.text_fetch_failed(reason);
        Vec::new()
    })
}

#[wasm_bindgen(js_name = loadAlignment)]
pub fn load_alignment(source: &str) -> Result<JsValue, JsValue> {
    wasm_info!("loadAlignment: {} bytes", source.len());
    step("loadAlignment", |session| {
        if let Err(e) = session.load_alignment(source) {
            wasm_warn!("{}", e);
        }
        Vec::new()
    })
}

#[wasm_bindgen(js_name = alignmentFetchFailed)]
pub fn alignment_fetch_failed(reason: &str) -> Result<JsValue, JsValue> {
    step("alignmentFetchFailed", |session| {
        session.alignment_fetch_failed(reason);
        Vec::new()
    })
}

#[wasm_bindgen(js_name = audioLoaded)]
pub fn audio_loaded(duration_ms: f64) -> Result<JsValue, JsValue> {
    wasm_info!("audioLoaded: {} ms", duration_ms);
    step("audioLoaded", |session| {
        session.audio_loaded(ms_from_js(duration_ms));
        Vec::new()
    })
}

#[wasm_bindgen(js_name = audioFailed)]
pub fn audio_failed(reason: &str) -> Result<JsValue, JsValue> {
    step("audioFailed", |session| {
        session.audio_failed(reason);
        Vec::new()
    })
}

// ============================================================================
// Playback
// ============================================================================

#[wasm_bindgen]
pub fn play() -> Result<JsValue, JsValue> {
    step("play", ReadAlongSession::play)
}

#[wasm_bindgen]
pub fn pause() -> Result<JsValue, JsValue> {
    step("pause", ReadAlongSession::pause)
}

#[wasm_bindgen(js_name = togglePlay)]
pub fn toggle_play() -> Result<JsValue, JsValue> {
    step("togglePlay", ReadAlongSession::toggle_play)
}

#[wasm_bindgen]
pub fn stop() -> Result<JsValue, JsValue> {
    step("stop", ReadAlongSession::stop)
}

/// Periodic clock tick with the transport's current position
#[wasm_bindgen]
pub fn tick(time_ms: f64, viewport: &JsViewport) -> Result<JsValue, JsValue> {
    step("tick", |session| session.tick(ms_from_js(time_ms), viewport))
}

#[wasm_bindgen]
pub fn seek(time_ms: f64, viewport: &JsViewport) -> Result<JsValue, JsValue> {
    wasm_info!("seek: {} ms", time_ms);
    step("seek", |session| session.seek(ms_from_js(time_ms), viewport))
}

#[wasm_bindgen(js_name = progressBarClicked)]
pub fn progress_bar_clicked(ratio: f64, viewport: &JsViewport) -> Result<JsValue, JsValue> {
    step("progressBarClicked", |session| session.progress_bar_clicked(ratio, viewport))
}

#[wasm_bindgen]
pub fn rewind(viewport: &JsViewport) -> Result<JsValue, JsValue> {
    step("rewind", |session| session.rewind(viewport))
}

#[wasm_bindgen(js_name = audioEnded)]
pub fn audio_ended() -> Result<JsValue, JsValue> {
    step("audioEnded", ReadAlongSession::audio_ended)
}

#[wasm_bindgen(js_name = wordClicked)]
pub fn word_clicked(unit_id: &str, viewport: &JsViewport) -> Result<JsValue, JsValue> {
    let result = with_session(|session| session.word_clicked(unit_id, viewport))?;
    let effects = result.map_err(|e| js_error(e.to_string()))?;
    step("wordClicked", move |_| effects)
}

// ============================================================================
// Scroll guard
// ============================================================================

#[wasm_bindgen(js_name = manualScroll)]
pub fn manual_scroll(viewport: &JsViewport) -> Result<JsValue, JsValue> {
    wasm_log!("manualScroll");
    step("manualScroll", |session| session.manual_scroll(viewport))
}

#[wasm_bindgen(js_name = highlightedUnitVisible)]
pub fn highlighted_unit_visible() -> Result<JsValue, JsValue> {
    step("highlightedUnitVisible", ReadAlongSession::highlighted_unit_visible)
}

/// Callback for a `scheduleResume` effect
#[wasm_bindgen(js_name = resumeTimerFired)]
pub fn resume_timer_fired(token: f64) -> Result<JsValue, JsValue> {
    wasm_log!("resumeTimerFired: token {}", token);
    step("resumeTimerFired", |session| session.resume_timer_fired(ms_from_js(token)))
}

#[wasm_bindgen(js_name = returnToReading)]
pub fn return_to_reading() -> Result<JsValue, JsValue> {
    step("returnToReading", |session| session.return_to_reading())
}

#[wasm_bindgen(js_name = toggleTranslations)]
pub fn toggle_translations() -> Result<JsValue, JsValue> {
    step("toggleTranslations", |session| {
        session.toggle_translations();
        Vec::new()
    })
}

// ============================================================================
// Anchors
// ============================================================================

#[wasm_bindgen(js_name = toggleAnchorMode)]
pub fn toggle_anchor_mode() -> Result<JsValue, JsValue> {
    let active = with_session(ReadAlongSession::toggle_anchor_mode)?
        .map_err(|e| js_error(e.to_string()))?;
    wasm_info!("toggleAnchorMode: {}", active);
    step("toggleAnchorMode", |_| Vec::new())
}

fn insert_anchor(unit_id: &str, placement: Placement) -> Result<JsValue, JsValue> {
    let anchor = with_session(|session| session.insert_anchor(unit_id, placement))?
        .map_err(|e| js_error(e.to_string()))?;
    serialize(&anchor, "insertAnchor")
}

#[wasm_bindgen(js_name = insertAnchorBefore)]
pub fn insert_anchor_before(unit_id: &str) -> Result<JsValue, JsValue> {
    insert_anchor(unit_id, Placement::Before)
}

#[wasm_bindgen(js_name = insertAnchorAfter)]
pub fn insert_anchor_after(unit_id: &str) -> Result<JsValue, JsValue> {
    insert_anchor(unit_id, Placement::After)
}

/// Delete the latest anchor attached to a word
#[wasm_bindgen(js_name = deleteAnchor)]
pub fn delete_anchor(unit_id: &str) -> Result<JsValue, JsValue> {
    let anchor = with_session(|session| session.delete_anchor_on(unit_id))?
        .map_err(|e| js_error(e.to_string()))?;
    serialize(&anchor, "deleteAnchor")
}

#[wasm_bindgen(js_name = removeAnchor)]
pub fn remove_anchor(anchor_id: &str) -> Result<JsValue, JsValue> {
    let anchor = with_session(|session| session.remove_anchor(anchor_id))?
        .map_err(|e| js_error(e.to_string()))?;
    serialize(&anchor, "removeAnchor")
}

#[wasm_bindgen(js_name = moveAnchor)]
pub fn move_anchor(anchor_id: &str, time_ms: f64) -> Result<JsValue, JsValue> {
    let anchor = with_session(|session| session.move_anchor(anchor_id, ms_from_js(time_ms)))?
        .map_err(|e| js_error(e.to_string()))?;
    serialize(&anchor, "moveAnchor")
}

/// `null` when the anchors can be exported, else a `{ kind, ... }` diagnostic
#[wasm_bindgen(js_name = validateAnchors)]
pub fn validate_anchors() -> Result<JsValue, JsValue> {
    match with_session(|session| session.validate_anchors())? {
        Ok(()) => Ok(JsValue::NULL),
        Err(e) => {
            wasm_warn!("{}", e);
            serialize(&e, "validateAnchors")
        }
    }
}

/// Corrected alignment document. Refusals are thrown as their message.
#[wasm_bindgen(js_name = exportAlignment)]
pub fn export_alignment() -> Result<String, JsValue> {
    with_session(|session| session.export_alignment())?.map_err(|e| js_error(e.to_string()))
}

#[wasm_bindgen(js_name = exportAnchoredText)]
pub fn export_anchored_text() -> Result<String, JsValue> {
    with_session(|session| session.export_anchored_text())
}

// ============================================================================
// Rendering helpers
// ============================================================================

#[wasm_bindgen(js_name = getRenderState)]
pub fn get_render_state() -> Result<JsValue, JsValue> {
    let state = with_session(|session| session.render_state())?;
    serialize(&state, "getRenderState")
}

/// Localized interface message
#[wasm_bindgen(js_name = translateMessage)]
pub fn translate_message(key: &str) -> Result<String, JsValue> {
    with_session(|session| translate(key, session.config().language))
}

#[wasm_bindgen(js_name = resolveAssetUrl)]
pub fn resolve_asset_url(path: &str) -> Result<String, JsValue> {
    with_session(|session| session.config().resolve_asset_url(path))
}
