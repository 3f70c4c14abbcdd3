//! Viewport geometry capability
//!
//! Sync logic never touches the DOM. The rendering collaborator answers
//! visibility and layout questions through `ViewportProbe`; scrolling goes
//! back out as effects.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Client rectangle in CSS pixels
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Geometry of a highlighted unit and the boxes around it
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitLayout {
    /// The word itself
    pub unit: Rect,
    /// The word's immediate container (its sentence line)
    pub line: Rect,
    /// Scrollable text column of the page
    pub container: Rect,
    /// The page element
    pub page: Rect,
}

impl UnitLayout {
    /// Unit is below the page's visible area or above the viewport top
    pub fn overflows_page(&self) -> bool {
        let below = self.unit.bottom() > self.page.bottom();
        let above = self.unit.bottom() < 0.0;
        below || above
    }

    /// Unit is left or right of the text column's visible area
    pub fn overflows_container(&self) -> bool {
        let left = self.unit.right() < self.container.left;
        let right = self.unit.right() > self.container.right();
        left || right
    }

    /// Page has been scrolled away from its resting offset
    pub fn page_drifted(&self) -> bool {
        self.unit.left < 0.0 || self.page.left.abs() > 0.5
    }

    /// Vertical delta bringing the next line into the column
    pub fn vertical_scroll_delta(&self) -> f64 {
        self.container.height - self.line.height
    }

    /// Horizontal target aligning the unit's left edge with an inset
    pub fn horizontal_scroll_target(&self, inset: f64) -> f64 {
        self.unit.left - inset
    }
}

pub trait ViewportProbe {
    /// Whether the unit is currently inside the visible viewport
    fn is_unit_visible(&self, unit_id: &str) -> bool;

    /// Detailed geometry, when the renderer can provide it
    fn unit_layout(&self, _unit_id: &str) -> Option<UnitLayout> {
        None
    }
}

/// Probe for hosts without a view: everything is visible
#[derive(Clone, Copy, Debug, Default)]
pub struct Headless;

impl ViewportProbe for Headless {
    fn is_unit_visible(&self, _unit_id: &str) -> bool {
        true
    }
}

/// Fixed geometry captured by the renderer
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportSnapshot {
    pub visible: HashSet<String>,
    pub layouts: HashMap<String, UnitLayout>,
}

impl ViewportSnapshot {
    pub fn with_layout(mut self, unit_id: &str, layout: UnitLayout) -> Self {
        self.layouts.insert(unit_id.to_string(), layout);
        self
    }

    pub fn with_visible(mut self, unit_id: &str) -> Self {
        self.visible.insert(unit_id.to_string());
        self
    }
}

impl ViewportProbe for ViewportSnapshot {
    fn is_unit_visible(&self, unit_id: &str) -> bool {
        self.visible.contains(unit_id)
    }

    fn unit_layout(&self, unit_id: &str) -> Option<UnitLayout> {
        self.layouts.get(unit_id).copied()
    }
}
