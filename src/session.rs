//! Read-along session
//!
//! `ReadAlongSession` owns every piece of mutable state: the parsed text, the
//! alignment table, playback and scroll state, and the anchor editor. All
//! mutations go through `&mut self`, so a clock tick can never observe a
//! half-applied seek or anchor edit.

use serde::Serialize;

use crate::anchors::{self, AnchorEditor};
use crate::config::ReadAlongConfig;
use crate::errors::{AnchorEditError, ExportError, LoadFailure};
use crate::i18n::translate;
use crate::models::{
    AlignmentTable, Anchor, AssetStatus, AssetStatuses, Document, Placement, PlaybackState, SyncPhase,
    TextUnit,
};
use crate::parse::{anchor_marker_attributes, format_seconds, parse_smil, parse_tei, write_tei};
use crate::sync::{PlaybackSync, ScrollGuard, SyncContext, SyncEffect, TransportCommand, ViewportProbe};

/// Snapshot handed to the renderer after each step
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub playback: PlaybackState,
    pub page_index: Option<usize>,
    pub page_count: usize,
    pub statuses: AssetStatuses,
    pub has_translations: bool,
    pub translations_visible: bool,
    pub anchor_mode: bool,
    pub anchors: Vec<Anchor>,
    /// Localized load error messages
    pub messages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ReadAlongSession {
    config: ReadAlongConfig,
    document: Document,
    table: AlignmentTable,
    statuses: AssetStatuses,
    failures: Vec<LoadFailure>,
    audio_duration_ms: Option<u64>,
    state: PlaybackState,
    sync: PlaybackSync,
    guard: ScrollGuard,
    editor: AnchorEditor,
    anchor_mode: bool,
    translations_visible: bool,
}

impl ReadAlongSession {
    pub fn new(config: ReadAlongConfig) -> Self {
        Self {
            sync: PlaybackSync::from_config(&config),
            guard: ScrollGuard::from_config(&config),
            config,
            translations_visible: true,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReadAlongConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn table(&self) -> &AlignmentTable {
        &self.table
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn statuses(&self) -> AssetStatuses {
        self.statuses
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn anchors(&self) -> &[Anchor] {
        self.editor.anchors()
    }

    pub fn anchor_mode(&self) -> bool {
        self.anchor_mode
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Parse and install the text document. An empty result is a text load
    /// failure; the previous document is replaced either way.
    pub fn load_text(&mut self, source: &str) -> Result<(), LoadFailure> {
        self.document = parse_tei(source);
        self.editor.clear();
        self.anchor_mode = false;
        self.state.current_page_id = None;

        if self.document.is_empty() {
            return Err(self.fail(LoadFailure::Text("document has no pages".to_string())));
        }
        self.statuses.text = AssetStatus::Loaded;
        log::info!(
            "text loaded: {} page(s), {} word(s)",
            self.document.page_count(),
            self.document.word_count()
        );
        self.check_alignment_order();
        Ok(())
    }

    /// The text could not be fetched
    pub fn text_fetch_failed(&mut self, reason: &str) -> LoadFailure {
        self.fail(LoadFailure::Text(reason.to_string()))
    }

    /// Parse and install the alignment. An empty table is an alignment load
    /// failure.
    pub fn load_alignment(&mut self, source: &str) -> Result<(), LoadFailure> {
        self.table = parse_smil(source);
        if let Some(duration) = self.audio_duration_ms {
            self.table.install_whole_recording(duration);
        }

        if self.table.is_empty() {
            return Err(self.fail(LoadFailure::Alignment("alignment has no entries".to_string())));
        }
        self.statuses.alignment = AssetStatus::Loaded;
        log::info!("alignment loaded: {} entries", self.table.len());
        self.check_alignment_order();
        self.try_ready();
        Ok(())
    }

    /// The alignment could not be fetched
    pub fn alignment_fetch_failed(&mut self, reason: &str) -> LoadFailure {
        self.fail(LoadFailure::Alignment(reason.to_string()))
    }

    /// Audio metadata is known: install the whole-recording entry
    pub fn audio_loaded(&mut self, duration_ms: u64) {
        self.audio_duration_ms = Some(duration_ms);
        self.table.install_whole_recording(duration_ms);
        self.statuses.audio = AssetStatus::Loaded;
        log::info!("audio loaded: {} s", format_seconds(duration_ms));
        self.try_ready();
    }

    pub fn audio_failed(&mut self, reason: &str) -> LoadFailure {
        self.fail(LoadFailure::Audio(reason.to_string()))
    }

    fn fail(&mut self, failure: LoadFailure) -> LoadFailure {
        match failure {
            LoadFailure::Text(_) => self.statuses.text = AssetStatus::Error,
            LoadFailure::Audio(_) => self.statuses.audio = AssetStatus::Error,
            LoadFailure::Alignment(_) => self.statuses.alignment = AssetStatus::Error,
        }
        log::error!("{}", failure);
        self.failures.push(failure.clone());
        failure
    }

    fn try_ready(&mut self) {
        if self.statuses.audio == AssetStatus::Loaded && self.statuses.alignment == AssetStatus::Loaded {
            self.sync.mark_ready(&mut self.state);
        }
    }

    fn check_alignment_order(&self) {
        if let Some((previous, next)) = self.table.ordering_violation() {
            log::warn!("alignment entries out of order: '{}' starts after '{}'", previous, next);
        }
        if let Some((previous, next)) = self.table.document_ordering_violation(&self.document) {
            log::warn!("alignment disagrees with reading order at '{}' -> '{}'", previous, next);
        }
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn play(&mut self) -> Vec<SyncEffect> {
        self.sync.play(&mut self.state)
    }

    pub fn pause(&mut self) -> Vec<SyncEffect> {
        self.sync.pause(&mut self.state)
    }

    pub fn toggle_play(&mut self) -> Vec<SyncEffect> {
        if self.state.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn stop(&mut self) -> Vec<SyncEffect> {
        self.sync.stop(&mut self.state, &mut self.guard)
    }

    /// Clock tick from the audio transport
    pub fn tick(&mut self, time_ms: u64, probe: &dyn ViewportProbe) -> Vec<SyncEffect> {
        let ctx = SyncContext {
            table: &self.table,
            document: &self.document,
            probe,
        };
        self.sync.on_tick(&mut self.state, &self.guard, ctx, time_ms)
    }

    pub fn seek(&mut self, time_ms: u64, probe: &dyn ViewportProbe) -> Vec<SyncEffect> {
        let ctx = SyncContext {
            table: &self.table,
            document: &self.document,
            probe,
        };
        self.sync.seek(&mut self.state, &mut self.guard, ctx, time_ms)
    }

    /// Seek to `ratio` of the recording, clamped to `[0, 1]`
    pub fn progress_bar_clicked(&mut self, ratio: f64, probe: &dyn ViewportProbe) -> Vec<SyncEffect> {
        let Some(total) = self.table.total_duration_ms() else {
            return Vec::new();
        };
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        self.seek((total as f64 * ratio).round() as u64, probe)
    }

    /// Jump back by the configured rewind distance
    pub fn rewind(&mut self, probe: &dyn ViewportProbe) -> Vec<SyncEffect> {
        let target = self.state.current_time_ms.saturating_sub(self.config.rewind_ms);
        self.seek(target, probe)
    }

    pub fn audio_ended(&mut self) -> Vec<SyncEffect> {
        self.sync.on_ended(&mut self.state)
    }

    /// Click on a word. In anchor mode this toggles an anchor before the
    /// word; otherwise it seeks there and, when paused, plays that word alone.
    pub fn word_clicked(
        &mut self,
        unit_id: &str,
        probe: &dyn ViewportProbe,
    ) -> Result<Vec<SyncEffect>, AnchorEditError> {
        if self.anchor_mode {
            if self.editor.has_anchor(unit_id, Placement::Before) {
                self.delete_anchors_on(unit_id)?;
            } else {
                self.insert_anchor(unit_id, Placement::Before)?;
            }
            return Ok(Vec::new());
        }

        let Some(interval) = self.table.lookup(unit_id) else {
            log::debug!("click on unaligned unit '{}'", unit_id);
            return Ok(Vec::new());
        };
        let was_playing = self.state.is_playing();
        let ctx = SyncContext {
            table: &self.table,
            document: &self.document,
            probe,
        };
        let mut effects = self.sync.seek_to_unit(&mut self.state, &mut self.guard, ctx, unit_id);
        if !was_playing && self.state.phase != SyncPhase::Idle {
            effects.push(SyncEffect::transport(TransportCommand::PlayUnit {
                unit_id: unit_id.to_string(),
                start_ms: interval.start_ms,
                duration_ms: interval.duration_ms,
            }));
        }
        Ok(effects)
    }

    // ------------------------------------------------------------------
    // Scroll guard
    // ------------------------------------------------------------------

    pub fn manual_scroll(&mut self, probe: &dyn ViewportProbe) -> Vec<SyncEffect> {
        if self.guard.on_manual_scroll(&mut self.state, probe) {
            vec![SyncEffect::GuideVisibility { visible: true }]
        } else {
            Vec::new()
        }
    }

    pub fn highlighted_unit_visible(&mut self) -> Vec<SyncEffect> {
        match self.guard.on_highlighted_unit_visible(&self.state) {
            Some(ticket) => vec![SyncEffect::ScheduleResume {
                token: ticket.token,
                delay_ms: ticket.delay_ms,
            }],
            None => Vec::new(),
        }
    }

    pub fn resume_timer_fired(&mut self, token: u64) -> Vec<SyncEffect> {
        let guide_was_visible = self.state.guide_visible;
        if self.guard.on_resume_due(&mut self.state, token) && guide_was_visible {
            vec![SyncEffect::GuideVisibility { visible: false }]
        } else {
            Vec::new()
        }
    }

    pub fn return_to_reading(&self) -> Vec<SyncEffect> {
        self.sync.return_to_reading(&self.state)
    }

    pub fn toggle_translations(&mut self) -> bool {
        self.translations_visible = !self.translations_visible;
        self.translations_visible
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    /// Enter or leave anchor mode. Entering seeds anchors from markers in
    /// the text; leaving destroys every anchor and marker.
    pub fn toggle_anchor_mode(&mut self) -> Result<bool, AnchorEditError> {
        if !self.config.editable {
            return Err(AnchorEditError::AnchorModeInactive);
        }
        self.anchor_mode = !self.anchor_mode;
        if self.anchor_mode {
            self.editor.seed_from_markers(&self.document, &self.table);
            log::info!("anchor mode on, {} anchor(s)", self.editor.len());
        } else {
            let dropped = self.editor.clear().len();
            let markers = self.document.clear_markers();
            log::info!("anchor mode off, dropped {} anchor(s), {} marker(s)", dropped, markers);
        }
        Ok(self.anchor_mode)
    }

    pub fn insert_anchor(&mut self, unit_id: &str, placement: Placement) -> Result<Anchor, AnchorEditError> {
        self.require_anchor_mode()?;
        let anchor = match placement {
            Placement::Before => self.editor.insert_before(&self.document, &self.table, unit_id)?,
            Placement::After => self.editor.insert_after(&self.document, &self.table, unit_id)?,
        };
        self.attach_marker(anchor, placement)
    }

    /// Put the marker for a freshly inserted anchor into the document, or
    /// take the anchor back out of the editor when that fails
    fn attach_marker(&mut self, anchor: Anchor, placement: Placement) -> Result<Anchor, AnchorEditError> {
        let marker = TextUnit::anchor_marker(
            anchor.id.clone(),
            anchor_marker_attributes(&anchor.id, anchor.time_ms),
        );
        if self.document.insert_marker(&anchor.unit_id, placement, marker) {
            return Ok(anchor);
        }
        log::warn!("could not place marker for anchor {}, rolling back", anchor.id);
        self.editor.delete_anchor(&anchor.id)?;
        Err(AnchorEditError::MarkerRejected(anchor.id))
    }

    /// Remove the latest anchor attached to `unit_id`
    pub fn delete_anchor_on(&mut self, unit_id: &str) -> Result<Anchor, AnchorEditError> {
        self.require_anchor_mode()?;
        let anchor = self
            .editor
            .delete(unit_id)
            .ok_or_else(|| AnchorEditError::UnknownAnchor(unit_id.to_string()))?;
        self.document.remove_marker(&anchor.id);
        Ok(anchor)
    }

    /// Remove every anchor placed before `unit_id`
    fn delete_anchors_on(&mut self, unit_id: &str) -> Result<(), AnchorEditError> {
        let ids: Vec<String> = self
            .editor
            .anchors()
            .iter()
            .filter(|a| a.unit_id == unit_id && a.placement == Placement::Before)
            .map(|a| a.id.clone())
            .collect();
        for id in ids {
            self.remove_anchor(&id)?;
        }
        Ok(())
    }

    pub fn remove_anchor(&mut self, anchor_id: &str) -> Result<Anchor, AnchorEditError> {
        self.require_anchor_mode()?;
        let anchor = self.editor.delete_anchor(anchor_id)?;
        self.document.remove_marker(&anchor.id);
        Ok(anchor)
    }

    pub fn move_anchor(&mut self, anchor_id: &str, time_ms: u64) -> Result<Anchor, AnchorEditError> {
        self.require_anchor_mode()?;
        let anchor = self.editor.move_anchor(anchor_id, time_ms)?.clone();
        self.document
            .set_marker_attribute(anchor_id, "time", format!("{}s", format_seconds(time_ms)));
        Ok(anchor)
    }

    pub fn validate_anchors(&self) -> Result<(), ExportError> {
        self.editor.validate_ordering()
    }

    /// Corrected alignment document for the current anchors
    pub fn export_alignment(&self) -> Result<String, ExportError> {
        anchors::export_alignment(&self.document, &self.table, self.editor.anchors())
    }

    /// Text document including anchor markers
    pub fn export_anchored_text(&self) -> String {
        write_tei(&self.document)
    }

    fn require_anchor_mode(&self) -> Result<(), AnchorEditError> {
        if self.anchor_mode {
            Ok(())
        } else {
            Err(AnchorEditError::AnchorModeInactive)
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    pub fn render_state(&self) -> RenderState {
        let page_index = self
            .state
            .current_page_id
            .as_deref()
            .and_then(|id| self.document.page_index(id));

        let mut messages = Vec::new();
        for (status, key) in [
            (self.statuses.audio, "audio-error"),
            (self.statuses.text, "text-error"),
            (self.statuses.alignment, "alignment-error"),
        ] {
            if status == AssetStatus::Error {
                messages.push(translate(key, self.config.language));
            }
        }

        RenderState {
            playback: self.state.clone(),
            page_index,
            page_count: self.document.page_count(),
            statuses: self.statuses,
            has_translations: self.document.has_translations(),
            translations_visible: self.translations_visible,
            anchor_mode: self.anchor_mode,
            anchors: self.editor.ordered(),
            messages,
        }
    }
}
