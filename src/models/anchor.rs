//! Anchors: user-inserted timing breakpoints attached to words

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AnchorSummary;

/// Which side of the word the anchor sits on
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    Before,
    After,
}

/// Fixed marker palette, indexed with wraparound
pub const PALETTE: [&str; 40] = [
    "#69D2E7", "#A7DBD8", "#E0E4CC", "#F38630", "#FA6900",
    "#FE4365", "#FC9D9A", "#F9CDAD", "#C8C8A9", "#83AF9B",
    "#ECD078", "#D95B43", "#C02942", "#542437", "#53777A",
    "#556270", "#4ECDC4", "#C7F464", "#FF6B6B", "#C44D58",
    "#774F38", "#E08E79", "#F1D4AF", "#ECE5CE", "#C5E0DC",
    "#E8DDCB", "#CDB380", "#036564", "#033649", "#031634",
    "#490A3D", "#BD1550", "#E97F02", "#F8CA00", "#8A9B0F",
    "#594F4F", "#547980", "#45ADA8", "#9DE0AD", "#E5FCC2",
];

/// Color for the `index`-th anchor created
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

static DIGIT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// `<unit id>anchor<seq>`
    pub id: String,
    /// Word the anchor is attached to
    pub unit_id: String,
    pub placement: Placement,
    pub time_ms: u64,
    /// Text of the attached word
    pub label: String,
    pub color: String,
    /// Insertion sequence number, never reused within an editing session
    pub seq: u32,
    /// Word boundary in document order: the word's order index for
    /// `Before`, one past it for `After`
    pub boundary: usize,
}

impl Anchor {
    pub fn make_id(unit_id: &str, seq: u32) -> String {
        format!("{}anchor{}", unit_id, seq)
    }

    /// Document-order sort key
    pub fn order_key(&self) -> (usize, u32) {
        (self.boundary, self.seq)
    }

    /// Legacy ordering hint: every digit run in the id, concatenated
    pub fn order_hint(&self) -> Option<u64> {
        let digits: String = DIGIT_RUNS
            .find_iter(&self.id)
            .map(|m| m.as_str())
            .collect();
        digits.parse().ok()
    }

    pub fn summary(&self) -> AnchorSummary {
        AnchorSummary {
            anchor_id: self.id.clone(),
            unit_id: self.unit_id.clone(),
            text: self.label.clone(),
            time_ms: self.time_ms,
        }
    }
}
