//! Parsing module for the read-along engine
//!
//! Readers for the two companion documents: the structured text (`tei`)
//! and the time alignment (`smil`). Both degrade to empty results instead of
//! failing, and both can write their format back out.

pub mod clock;
pub mod smil;
pub mod tei;

// Re-export commonly used functions
pub use clock::{format_seconds, parse_clock_ms};
pub use smil::{parse_smil, try_parse_smil, write_smil};
pub use tei::{anchor_marker_attributes, parse_tei, try_parse_tei, write_tei};
