//! Playback state management
//!
//! `PlaybackState` is the single owned record of what is being read and
//! whether the viewport may follow it. It is mutated only through
//! `PlaybackSync` and `ScrollGuard`; renderers receive snapshots.

use serde::Serialize;
use serde_repr::Serialize_repr;

/// Playback state machine phases
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    /// No time source yet
    Idle,
    /// Alignment and audio are loaded
    Ready,
    Playing,
    Paused,
    /// Transient while a seek is applied
    Seeking,
}

/// Load status of one asset, numeric on the wire
#[derive(Serialize_repr, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AssetStatus {
    #[default]
    Loading = 0,
    Loaded = 1,
    Error = 2,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AssetStatuses {
    pub audio: AssetStatus,
    pub text: AssetStatus,
    pub alignment: AssetStatus,
}

/// Complete playback state
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub phase: SyncPhase,

    /// Last known playback position
    pub current_time_ms: u64,

    /// The one highlighted unit, if any
    pub active_unit_id: Option<String>,

    /// Whether the viewport follows the highlighted unit
    pub auto_scroll_enabled: bool,

    /// "Return to reading position" affordance
    pub guide_visible: bool,

    /// Page of the last highlighted unit
    pub current_page_id: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            current_time_ms: 0,
            active_unit_id: None,
            auto_scroll_enabled: true,
            guide_visible: false,
            current_page_id: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SyncPhase::Playing
    }

    /// Phases in which a time source exists
    pub fn has_time_source(&self) -> bool {
        !matches!(self.phase, SyncPhase::Idle)
    }

    pub fn is_active(&self, unit_id: &str) -> bool {
        self.active_unit_id.as_deref() == Some(unit_id)
    }
}
