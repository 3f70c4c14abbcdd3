//! Playback synchronization state machine
//!
//! ```text
//! Idle --mark_ready--> Ready --play--> Playing <--pause/play--> Paused
//!                        \                 \                     /
//!                         `----seek----> Seeking (transient) ---'
//! ```
//!
//! Each step takes the owned `PlaybackState` by reference and returns the
//! effects the renderer and the audio transport must apply, in order.
//! "Distinct until changed" is an equality check on the active unit.

use crate::config::{PageScrolling, ReadAlongConfig};
use crate::models::{AlignmentTable, Document, PlaybackState, SyncPhase};

use super::effects::{SyncEffect, TransportCommand};
use super::scroll_guard::ScrollGuard;
use super::viewport::ViewportProbe;

/// Read-only inputs for a sync step
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub table: &'a AlignmentTable,
    pub document: &'a Document,
    pub probe: &'a dyn ViewportProbe,
}

#[derive(Clone, Debug)]
pub struct PlaybackSync {
    page_scrolling: PageScrolling,
    scroll_inset_px: f64,
}

impl Default for PlaybackSync {
    fn default() -> Self {
        Self::from_config(&ReadAlongConfig::default())
    }
}

impl PlaybackSync {
    pub fn new(page_scrolling: PageScrolling, scroll_inset_px: f64) -> Self {
        Self {
            page_scrolling,
            scroll_inset_px,
        }
    }

    pub fn from_config(config: &ReadAlongConfig) -> Self {
        Self::new(config.page_scrolling, config.scroll_inset_px)
    }

    /// Idle -> Ready once the time source and tables exist
    pub fn mark_ready(&self, state: &mut PlaybackState) -> bool {
        if state.phase != SyncPhase::Idle {
            return false;
        }
        state.phase = SyncPhase::Ready;
        log::info!("playback ready");
        true
    }

    pub fn play(&self, state: &mut PlaybackState) -> Vec<SyncEffect> {
        match state.phase {
            SyncPhase::Ready | SyncPhase::Paused => {
                state.phase = SyncPhase::Playing;
                vec![SyncEffect::transport(TransportCommand::Play)]
            }
            _ => Vec::new(),
        }
    }

    pub fn pause(&self, state: &mut PlaybackState) -> Vec<SyncEffect> {
        if state.phase != SyncPhase::Playing {
            return Vec::new();
        }
        state.phase = SyncPhase::Paused;
        vec![SyncEffect::transport(TransportCommand::Pause)]
    }

    /// Periodic clock tick. Only highlights while playing.
    pub fn on_tick(
        &self,
        state: &mut PlaybackState,
        guard: &ScrollGuard,
        ctx: SyncContext<'_>,
        time_ms: u64,
    ) -> Vec<SyncEffect> {
        if !state.has_time_source() {
            return Vec::new();
        }
        state.current_time_ms = time_ms;
        if !state.is_playing() {
            return Vec::new();
        }

        let Some(unit_id) = ctx.table.resolve_at_ms(time_ms as i64) else {
            return Vec::new();
        };
        if state.is_active(unit_id) {
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.highlight(state, unit_id, &mut effects);
        self.navigate(state, guard, ctx, unit_id, true, &mut effects);
        effects
    }

    /// Jump to `time_ms`. Highlights regardless of play state and suspends
    /// autoscroll for the seek guard window.
    pub fn seek(
        &self,
        state: &mut PlaybackState,
        guard: &mut ScrollGuard,
        ctx: SyncContext<'_>,
        time_ms: u64,
    ) -> Vec<SyncEffect> {
        let resume_phase = match state.phase {
            SyncPhase::Idle => return Vec::new(),
            SyncPhase::Playing => SyncPhase::Playing,
            _ => SyncPhase::Paused,
        };
        state.phase = SyncPhase::Seeking;
        state.current_time_ms = time_ms;

        let mut effects = vec![SyncEffect::transport(TransportCommand::SeekTo { ms: time_ms })];
        let ticket = guard.suspend_for_seek(state);
        effects.push(SyncEffect::ScheduleResume {
            token: ticket.token,
            delay_ms: ticket.delay_ms,
        });

        if let Some(unit_id) = ctx.table.resolve_at_ms(time_ms as i64) {
            if !state.is_active(unit_id) {
                self.highlight(state, unit_id, &mut effects);
            }
            self.navigate(state, guard, ctx, unit_id, false, &mut effects);
        }

        state.phase = resume_phase;
        effects
    }

    /// Seek to the start of a unit
    pub fn seek_to_unit(
        &self,
        state: &mut PlaybackState,
        guard: &mut ScrollGuard,
        ctx: SyncContext<'_>,
        unit_id: &str,
    ) -> Vec<SyncEffect> {
        match ctx.table.lookup(unit_id) {
            Some(interval) => self.seek(state, guard, ctx, interval.start_ms),
            None => {
                log::debug!("seek to unaligned unit '{}' ignored", unit_id);
                Vec::new()
            }
        }
    }

    /// Stop the transport, clear highlight and re-enable autoscroll
    pub fn stop(&self, state: &mut PlaybackState, guard: &mut ScrollGuard) -> Vec<SyncEffect> {
        if state.phase == SyncPhase::Idle {
            return Vec::new();
        }
        let mut effects = vec![
            SyncEffect::transport(TransportCommand::Stop),
            SyncEffect::ClearHighlight,
        ];
        let guide_was_visible = state.guide_visible;
        guard.reset(state);
        if guide_was_visible {
            effects.push(SyncEffect::GuideVisibility { visible: false });
        }
        state.active_unit_id = None;
        state.current_time_ms = 0;
        state.phase = SyncPhase::Paused;
        effects
    }

    /// The transport reached the end of the recording
    pub fn on_ended(&self, state: &mut PlaybackState) -> Vec<SyncEffect> {
        if state.phase == SyncPhase::Idle {
            return Vec::new();
        }
        state.active_unit_id = None;
        state.phase = SyncPhase::Paused;
        vec![SyncEffect::ClearHighlight]
    }

    /// Bring the highlighted unit back to the top of the view
    pub fn return_to_reading(&self, state: &PlaybackState) -> Vec<SyncEffect> {
        match &state.active_unit_id {
            Some(unit_id) => vec![SyncEffect::ScrollIntoView {
                unit_id: unit_id.clone(),
                align_to_top: true,
            }],
            None => Vec::new(),
        }
    }

    fn highlight(&self, state: &mut PlaybackState, unit_id: &str, effects: &mut Vec<SyncEffect>) {
        effects.push(SyncEffect::ClearHighlight);
        effects.push(SyncEffect::Highlight {
            unit_id: unit_id.to_string(),
        });
        state.active_unit_id = Some(unit_id.to_string());
    }

    /// Page transition, then vertical scroll, then horizontal scroll
    fn navigate(
        &self,
        state: &mut PlaybackState,
        guard: &ScrollGuard,
        ctx: SyncContext<'_>,
        unit_id: &str,
        correct_drift: bool,
        effects: &mut Vec<SyncEffect>,
    ) {
        let Some(page_id) = ctx.document.page_of(unit_id) else {
            return;
        };

        let mut turned = false;
        if state.current_page_id.as_deref() != Some(page_id) {
            if state.current_page_id.is_some() {
                effects.push(self.turn_page(page_id));
                turned = true;
            }
            state.current_page_id = Some(page_id.to_string());
        }

        let auto_scroll = guard.should_auto_scroll(state);
        let Some(layout) = ctx.probe.unit_layout(unit_id) else {
            if auto_scroll && !ctx.probe.is_unit_visible(unit_id) {
                effects.push(SyncEffect::ScrollIntoView {
                    unit_id: unit_id.to_string(),
                    align_to_top: false,
                });
            }
            return;
        };

        if correct_drift && !turned && layout.page_drifted() {
            effects.push(self.turn_page(page_id));
        }

        if auto_scroll && layout.overflows_page() {
            effects.push(SyncEffect::ScrollIntoView {
                unit_id: unit_id.to_string(),
                align_to_top: false,
            });
            effects.push(SyncEffect::ScrollContainerBy {
                page_id: page_id.to_string(),
                top: layout.vertical_scroll_delta(),
            });
        }

        if auto_scroll && layout.overflows_container() {
            effects.push(SyncEffect::ScrollIntoView {
                unit_id: unit_id.to_string(),
                align_to_top: false,
            });
            effects.push(SyncEffect::ScrollContainerTo {
                page_id: page_id.to_string(),
                left: layout.horizontal_scroll_target(self.scroll_inset_px),
            });
        }
    }

    fn turn_page(&self, page_id: &str) -> SyncEffect {
        SyncEffect::TurnPage {
            page_id: page_id.to_string(),
            direction: self.page_scrolling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attributes, Interval, Page, Paragraph, Sentence, TextUnit};
    use crate::sync::viewport::{Headless, Rect, UnitLayout, ViewportSnapshot};

    fn document() -> Document {
        let page = |id: &str, words: &[&str]| Page {
            id: id.to_string(),
            img: None,
            attributes: Attributes::new(),
            paragraphs: vec![Paragraph {
                attributes: Attributes::new(),
                sentences: vec![Sentence {
                    attributes: Attributes::new(),
                    units: words.iter().map(|w| TextUnit::word(*w, *w)).collect(),
                }],
            }],
        };
        Document::new(vec![page("p1", &["w0", "w1"]), page("p2", &["w2"])])
    }

    fn table() -> AlignmentTable {
        let mut table = AlignmentTable::new();
        table.insert("w0", Interval::new(0, 500));
        table.insert("w1", Interval::new(500, 700));
        table.insert("w2", Interval::new(1200, 300));
        table.install_whole_recording(1500);
        table
    }

    fn playing() -> PlaybackState {
        PlaybackState {
            phase: SyncPhase::Playing,
            ..PlaybackState::new()
        }
    }

    fn highlights(effects: &[SyncEffect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                SyncEffect::Highlight { unit_id } => Some(unit_id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tick_highlights_once_per_unit() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::default();
        let guard = ScrollGuard::default();
        let mut state = playing();

        let effects = sync.on_tick(&mut state, &guard, ctx, 100);
        assert_eq!(effects[0], SyncEffect::ClearHighlight);
        assert_eq!(highlights(&effects), vec!["w0"]);
        assert!(sync.on_tick(&mut state, &guard, ctx, 200).is_empty());

        let effects = sync.on_tick(&mut state, &guard, ctx, 600);
        assert_eq!(highlights(&effects), vec!["w1"]);
        assert_eq!(state.active_unit_id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_tick_ignored_unless_playing() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::default();
        let guard = ScrollGuard::default();
        let mut state = PlaybackState {
            phase: SyncPhase::Paused,
            ..PlaybackState::new()
        };
        assert!(sync.on_tick(&mut state, &guard, ctx, 600).is_empty());
        assert_eq!(state.current_time_ms, 600);
        assert!(state.active_unit_id.is_none());
    }

    #[test]
    fn test_no_match_keeps_highlight() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::default();
        let guard = ScrollGuard::default();
        let mut state = playing();
        sync.on_tick(&mut state, &guard, ctx, 1300);
        assert!(sync.on_tick(&mut state, &guard, ctx, 9_000).is_empty());
        assert_eq!(state.active_unit_id.as_deref(), Some("w2"));
    }

    #[test]
    fn test_page_turn_only_after_first_page() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::new(PageScrolling::Vertical, 10.0);
        let guard = ScrollGuard::default();
        let mut state = playing();

        let first = sync.on_tick(&mut state, &guard, ctx, 0);
        assert!(!first.iter().any(|e| matches!(e, SyncEffect::TurnPage { .. })));
        assert_eq!(state.current_page_id.as_deref(), Some("p1"));

        let next = sync.on_tick(&mut state, &guard, ctx, 1250);
        assert_eq!(
            next[2],
            SyncEffect::TurnPage {
                page_id: "p2".into(),
                direction: PageScrolling::Vertical
            }
        );
        assert_eq!(state.current_page_id.as_deref(), Some("p2"));
    }

    #[test]
    fn test_scroll_order_and_amounts() {
        let (doc, table) = (document(), table());
        let layout = UnitLayout {
            unit: Rect::new(420.0, 320.0, 40.0, 20.0),
            line: Rect::new(0.0, 0.0, 400.0, 24.0),
            container: Rect::new(0.0, 0.0, 400.0, 300.0),
            page: Rect::new(0.0, 0.0, 400.0, 300.0),
        };
        let probe = ViewportSnapshot::default().with_layout("w1", layout);
        let ctx = SyncContext { table: &table, document: &doc, probe: &probe };
        let sync = PlaybackSync::default();
        let guard = ScrollGuard::default();
        let mut state = playing();
        state.current_page_id = Some("p1".into());

        let effects = sync.on_tick(&mut state, &guard, ctx, 600);
        let by = effects
            .iter()
            .position(|e| matches!(e, SyncEffect::ScrollContainerBy { .. }))
            .unwrap();
        let to = effects
            .iter()
            .position(|e| matches!(e, SyncEffect::ScrollContainerTo { .. }))
            .unwrap();
        assert!(by < to);
        assert_eq!(
            effects[by],
            SyncEffect::ScrollContainerBy { page_id: "p1".into(), top: 276.0 }
        );
        assert_eq!(
            effects[to],
            SyncEffect::ScrollContainerTo { page_id: "p1".into(), left: 410.0 }
        );
    }

    #[test]
    fn test_no_scroll_when_autoscroll_suspended() {
        let (doc, table) = (document(), table());
        let layout = UnitLayout {
            unit: Rect::new(10.0, 900.0, 40.0, 20.0),
            page: Rect::new(0.0, 0.0, 400.0, 300.0),
            container: Rect::new(0.0, 0.0, 400.0, 300.0),
            ..UnitLayout::default()
        };
        let probe = ViewportSnapshot::default().with_layout("w0", layout);
        let ctx = SyncContext { table: &table, document: &doc, probe: &probe };
        let sync = PlaybackSync::default();
        let guard = ScrollGuard::default();
        let mut state = playing();
        state.auto_scroll_enabled = false;

        let effects = sync.on_tick(&mut state, &guard, ctx, 0);
        assert_eq!(highlights(&effects), vec!["w0"]);
        assert!(!effects.iter().any(|e| matches!(
            e,
            SyncEffect::ScrollIntoView { .. } | SyncEffect::ScrollContainerBy { .. }
        )));
    }

    #[test]
    fn test_seek_highlights_while_paused_and_schedules_resume() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::default();
        let mut guard = ScrollGuard::new(100, 100);
        let mut state = PlaybackState {
            phase: SyncPhase::Paused,
            ..PlaybackState::new()
        };

        let effects = sync.seek(&mut state, &mut guard, ctx, 1300);
        assert_eq!(effects[0], SyncEffect::transport(TransportCommand::SeekTo { ms: 1300 }));
        let token = match effects[1] {
            SyncEffect::ScheduleResume { token, delay_ms: 100 } => token,
            ref other => panic!("unexpected effect {:?}", other),
        };
        assert_eq!(highlights(&effects), vec!["w2"]);
        assert_eq!(state.phase, SyncPhase::Paused);
        assert!(!state.auto_scroll_enabled);

        assert!(guard.on_resume_due(&mut state, token));
        assert!(state.auto_scroll_enabled);
    }

    #[test]
    fn test_seek_ignored_while_idle() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let mut state = PlaybackState::new();
        let effects = PlaybackSync::default().seek(&mut state, &mut ScrollGuard::default(), ctx, 10);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_stop_clears_and_cancels_resume() {
        let (doc, table) = (document(), table());
        let ctx = SyncContext { table: &table, document: &doc, probe: &Headless };
        let sync = PlaybackSync::default();
        let mut guard = ScrollGuard::default();
        let mut state = playing();
        sync.seek(&mut state, &mut guard, ctx, 600);
        let token = guard.pending_token().unwrap();
        guard.on_manual_scroll(&mut state, &ViewportSnapshot::default());

        let effects = sync.stop(&mut state, &mut guard);
        assert!(effects.contains(&SyncEffect::ClearHighlight));
        assert!(effects.contains(&SyncEffect::GuideVisibility { visible: false }));
        assert_eq!(state.phase, SyncPhase::Paused);
        assert!(state.active_unit_id.is_none());
        assert!(state.auto_scroll_enabled);
        assert!(!guard.on_resume_due(&mut state, token));
    }

    #[test]
    fn test_play_pause_transitions() {
        let sync = PlaybackSync::default();
        let mut state = PlaybackState::new();
        assert!(sync.play(&mut state).is_empty());
        assert!(sync.mark_ready(&mut state));
        assert!(!sync.mark_ready(&mut state));
        assert_eq!(sync.play(&mut state), vec![SyncEffect::transport(TransportCommand::Play)]);
        assert!(state.is_playing());
        assert_eq!(sync.pause(&mut state), vec![SyncEffect::transport(TransportCommand::Pause)]);
        assert_eq!(state.phase, SyncPhase::Paused);
    }
}
