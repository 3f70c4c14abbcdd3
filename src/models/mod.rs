//! Models module for the read-along engine
//!
//! This module contains the data models shared by the parsers, the
//! playback synchronizer and the anchor editor.

pub mod alignment;
pub mod anchor;
pub mod document;
pub mod playback_state;

// Re-export commonly used types
pub use alignment::{AlignmentTable, Interval, WHOLE_RECORDING};
pub use anchor::{color_for, Anchor, Placement, PALETTE};
pub use document::{Attributes, Document, MarkerRef, Page, Paragraph, Sentence, TextUnit, UnitLocation};
pub use playback_state::{AssetStatus, AssetStatuses, PlaybackState, SyncPhase};
