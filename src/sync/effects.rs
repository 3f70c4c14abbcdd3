//! Side effects emitted by the sync state machine
//!
//! Effects from one step are ordered: highlight, page navigation, vertical
//! scroll, horizontal scroll. The renderer must apply them in sequence.

use serde::Serialize;

use crate::config::PageScrolling;

/// Command for the audio transport collaborator
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransportCommand {
    /// Start or resume the whole recording
    Play,
    /// Play a single unit's clip
    PlayUnit {
        unit_id: String,
        start_ms: u64,
        duration_ms: u64,
    },
    Pause,
    Stop,
    SeekTo { ms: u64 },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncEffect {
    /// Remove highlight from every unit
    ClearHighlight,
    Highlight { unit_id: String },
    /// Bring a page into view
    TurnPage {
        page_id: String,
        direction: PageScrolling,
    },
    ScrollIntoView { unit_id: String, align_to_top: bool },
    /// Relative vertical scroll of a page's text column
    ScrollContainerBy { page_id: String, top: f64 },
    /// Absolute horizontal scroll of a page's text column
    ScrollContainerTo { page_id: String, left: f64 },
    /// Show or hide the "return to reading position" affordance
    GuideVisibility { visible: bool },
    /// Call back with `token` after `delay_ms` to resume autoscroll
    ScheduleResume { token: u64, delay_ms: u64 },
    Transport(TransportCommand),
}

impl SyncEffect {
    pub fn transport(command: TransportCommand) -> Self {
        SyncEffect::Transport(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_wire_shape() {
        let json = serde_json::to_string(&SyncEffect::Highlight { unit_id: "w0".into() }).unwrap();
        assert_eq!(json, r#"{"type":"highlight","unitId":"w0"}"#);

        let json = serde_json::to_string(&SyncEffect::transport(TransportCommand::SeekTo { ms: 500 })).unwrap();
        assert_eq!(json, r#"{"type":"transport","command":"seekTo","ms":500}"#);
    }
}
