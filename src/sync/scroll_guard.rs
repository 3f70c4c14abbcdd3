//! Scroll guard: suspends autoscroll while the user inspects the text
//!
//! Autoscroll is turned off by seeks, and by manual scrolling that takes the
//! highlighted unit off the page (which also arms the "return to reading
//! position" guide). It comes back only
//! through a resume timer: the guard hands out a ticket, the host calls
//! `on_resume_due` with the ticket's token after the delay, and only the most
//! recent ticket is honoured. Any newer suspension, seek or stop invalidates
//! older tickets, so two timers can never race each other.

use serde::Serialize;

use crate::config::ReadAlongConfig;
use crate::models::PlaybackState;

use super::viewport::ViewportProbe;

/// A scheduled autoscroll resume
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTicket {
    pub token: u64,
    pub delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ScrollGuard {
    seek_guard_ms: u64,
    resume_debounce_ms: u64,
    generation: u64,
    pending: Option<u64>,
}

impl Default for ScrollGuard {
    fn default() -> Self {
        Self::from_config(&ReadAlongConfig::default())
    }
}

impl ScrollGuard {
    pub fn new(seek_guard_ms: u64, resume_debounce_ms: u64) -> Self {
        Self {
            seek_guard_ms,
            resume_debounce_ms,
            generation: 0,
            pending: None,
        }
    }

    pub fn from_config(config: &ReadAlongConfig) -> Self {
        Self::new(config.seek_guard_ms, config.resume_debounce_ms)
    }

    pub fn should_auto_scroll(&self, state: &PlaybackState) -> bool {
        state.auto_scroll_enabled
    }

    /// Token of the resume timer that is still honoured, if any
    pub fn pending_token(&self) -> Option<u64> {
        self.pending
    }

    /// User scrolled the text by hand. Only matters once the highlighted
    /// unit has left the page; a nudge that keeps it in view changes
    /// nothing. Returns true if the guide was newly armed.
    pub fn on_manual_scroll(&mut self, state: &mut PlaybackState, probe: &dyn ViewportProbe) -> bool {
        let Some(active) = state.active_unit_id.as_deref() else {
            return false;
        };
        let off_page = match probe.unit_layout(active) {
            Some(layout) => layout.overflows_page(),
            None => !probe.is_unit_visible(active),
        };
        if !off_page {
            return false;
        }
        self.pending = None;
        state.auto_scroll_enabled = false;
        let newly_armed = !state.guide_visible;
        state.guide_visible = true;
        if newly_armed {
            log::debug!("manual scroll, autoscroll suspended");
        }
        newly_armed
    }

    /// The highlighted unit is back in view. Schedules a debounced resume
    /// when autoscroll is suspended.
    pub fn on_highlighted_unit_visible(&mut self, state: &PlaybackState) -> Option<ResumeTicket> {
        if state.auto_scroll_enabled && self.pending.is_none() {
            return None;
        }
        Some(self.schedule(self.resume_debounce_ms))
    }

    /// Suspend autoscroll for the seek guard window
    pub fn suspend_for_seek(&mut self, state: &mut PlaybackState) -> ResumeTicket {
        state.auto_scroll_enabled = false;
        self.schedule(self.seek_guard_ms)
    }

    /// Resume timer fired. Stale tokens are ignored.
    pub fn on_resume_due(&mut self, state: &mut PlaybackState, token: u64) -> bool {
        if self.pending != Some(token) {
            log::debug!("ignoring stale resume token {}", token);
            return false;
        }
        self.pending = None;
        state.auto_scroll_enabled = true;
        state.guide_visible = false;
        true
    }

    /// Cancel pending timers and re-enable autoscroll immediately
    pub fn reset(&mut self, state: &mut PlaybackState) {
        self.pending = None;
        state.auto_scroll_enabled = true;
        state.guide_visible = false;
    }

    fn schedule(&mut self, delay_ms: u64) -> ResumeTicket {
        self.generation += 1;
        self.pending = Some(self.generation);
        ResumeTicket {
            token: self.generation,
            delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{Headless, Rect, UnitLayout, ViewportSnapshot};

    fn scrolled_away() -> ViewportSnapshot {
        ViewportSnapshot::default()
    }

    fn reading_state() -> PlaybackState {
        PlaybackState {
            active_unit_id: Some("w0".into()),
            ..PlaybackState::new()
        }
    }

    #[test]
    fn test_manual_scroll_without_highlight_is_ignored() {
        let mut guard = ScrollGuard::default();
        let mut state = PlaybackState::new();
        assert!(!guard.on_manual_scroll(&mut state, &scrolled_away()));
        assert!(guard.should_auto_scroll(&state));
    }

    #[test]
    fn test_manual_scroll_then_visible_resumes_after_debounce() {
        let mut guard = ScrollGuard::new(100, 250);
        let mut state = reading_state();
        assert!(guard.on_manual_scroll(&mut state, &scrolled_away()));
        assert!(!guard.should_auto_scroll(&state));
        assert!(state.guide_visible);

        let ticket = guard.on_highlighted_unit_visible(&state).unwrap();
        assert_eq!(ticket.delay_ms, 250);
        assert!(!guard.should_auto_scroll(&state));

        assert!(guard.on_resume_due(&mut state, ticket.token));
        assert!(guard.should_auto_scroll(&state));
        assert!(!state.guide_visible);
    }

    #[test]
    fn test_manual_scroll_keeping_unit_visible_keeps_autoscroll() {
        let mut guard = ScrollGuard::default();
        let mut state = reading_state();
        assert!(!guard.on_manual_scroll(&mut state, &Headless));
        assert!(guard.should_auto_scroll(&state));
        assert!(!state.guide_visible);

        // Layout wins over the visibility answer
        let inside = UnitLayout {
            unit: Rect::new(10.0, 100.0, 40.0, 20.0),
            page: Rect::new(0.0, 0.0, 800.0, 600.0),
            ..UnitLayout::default()
        };
        let below = UnitLayout {
            unit: Rect::new(10.0, 700.0, 40.0, 20.0),
            ..inside
        };
        let probe = ViewportSnapshot::default().with_layout("w0", inside);
        assert!(!guard.on_manual_scroll(&mut state, &probe));
        assert!(guard.should_auto_scroll(&state));

        let probe = ViewportSnapshot::default().with_visible("w0").with_layout("w0", below);
        assert!(guard.on_manual_scroll(&mut state, &probe));
        assert!(!guard.should_auto_scroll(&state));
    }

    #[test]
    fn test_new_manual_scroll_cancels_pending_resume() {
        let mut guard = ScrollGuard::default();
        let mut state = reading_state();
        guard.on_manual_scroll(&mut state, &scrolled_away());
        let ticket = guard.on_highlighted_unit_visible(&state).unwrap();
        guard.on_manual_scroll(&mut state, &scrolled_away());

        assert!(!guard.on_resume_due(&mut state, ticket.token));
        assert!(!guard.should_auto_scroll(&state));
    }

    #[test]
    fn test_only_latest_ticket_is_honoured() {
        let mut guard = ScrollGuard::default();
        let mut state = reading_state();
        let first = guard.suspend_for_seek(&mut state);
        let second = guard.suspend_for_seek(&mut state);
        assert_ne!(first.token, second.token);

        assert!(!guard.on_resume_due(&mut state, first.token));
        assert!(!state.auto_scroll_enabled);
        assert!(guard.on_resume_due(&mut state, second.token));
        assert!(state.auto_scroll_enabled);
    }

    #[test]
    fn test_visible_while_enabled_schedules_nothing() {
        let mut guard = ScrollGuard::default();
        let state = reading_state();
        assert_eq!(guard.on_highlighted_unit_visible(&state), None);
    }

    #[test]
    fn test_reset_cancels_pending() {
        let mut guard = ScrollGuard::default();
        let mut state = reading_state();
        let ticket = guard.suspend_for_seek(&mut state);
        guard.reset(&mut state);
        assert!(state.auto_scroll_enabled);
        assert_eq!(guard.pending_token(), None);
        assert!(!guard.on_resume_due(&mut state, ticket.token));
    }
}
