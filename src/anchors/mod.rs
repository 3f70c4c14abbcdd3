//! Anchor editing and alignment export

pub mod editor;
pub mod export;

pub use editor::{validate_ordering, AnchorEditor};
pub use export::{export_alignment, retime};
