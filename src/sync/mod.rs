//! Playback synchronization: highlight, page navigation and scrolling

pub mod effects;
pub mod playback;
pub mod scroll_guard;
pub mod viewport;

pub use effects::{SyncEffect, TransportCommand};
pub use playback::{PlaybackSync, SyncContext};
pub use scroll_guard::{ResumeTicket, ScrollGuard};
pub use viewport::{Headless, Rect, UnitLayout, ViewportProbe, ViewportSnapshot};
