//! Anchor editor
//!
//! Owns the working set of anchors for one editing session. Anchors are
//! kept in insertion order; ordering checks work on a sorted copy so the
//! list itself is only changed through the operations below.

use crate::errors::{AnchorEditError, ExportError};
use crate::models::{color_for, AlignmentTable, Anchor, Document, Placement, TextUnit};
use crate::parse::parse_clock_ms;

#[derive(Clone, Debug, Default)]
pub struct AnchorEditor {
    anchors: Vec<Anchor>,
    next_seq: u32,
}

impl AnchorEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors in insertion order
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Anchors in document order
    pub fn ordered(&self) -> Vec<Anchor> {
        sorted(&self.anchors)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, anchor_id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.id == anchor_id)
    }

    /// Whether an anchor sits on `unit_id` with the given placement
    pub fn has_anchor(&self, unit_id: &str, placement: Placement) -> bool {
        self.anchors
            .iter()
            .any(|a| a.unit_id == unit_id && a.placement == placement)
    }

    /// New anchor at the start of `unit_id`
    pub fn insert_before(
        &mut self,
        document: &Document,
        table: &AlignmentTable,
        unit_id: &str,
    ) -> Result<Anchor, AnchorEditError> {
        self.insert(document, table, unit_id, Placement::Before)
    }

    /// New anchor at the start of the word following `unit_id`, or at the
    /// unit's own start when no aligned word follows
    pub fn insert_after(
        &mut self,
        document: &Document,
        table: &AlignmentTable,
        unit_id: &str,
    ) -> Result<Anchor, AnchorEditError> {
        self.insert(document, table, unit_id, Placement::After)
    }

    fn insert(
        &mut self,
        document: &Document,
        table: &AlignmentTable,
        unit_id: &str,
        placement: Placement,
    ) -> Result<Anchor, AnchorEditError> {
        let (label, order) = word_at(document, unit_id)?;
        let time_ms = boundary_time(document, table, unit_id, order, placement)
            .ok_or_else(|| AnchorEditError::Unaligned(unit_id.to_string()))?;

        let (seq, id) = self.fresh_id(document, unit_id);
        let anchor = Anchor {
            id,
            unit_id: unit_id.to_string(),
            placement,
            time_ms,
            label,
            color: color_for(seq as usize).to_string(),
            seq,
            boundary: boundary_index(order, placement),
        };
        log::debug!("anchor {} inserted at {} ms", anchor.id, time_ms);
        self.anchors.push(anchor.clone());
        Ok(anchor)
    }

    /// Remove the most recently inserted anchor attached to `unit_id`
    pub fn delete(&mut self, unit_id: &str) -> Option<Anchor> {
        let pos = self
            .anchors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.unit_id == unit_id)
            .max_by_key(|(_, a)| a.seq)
            .map(|(i, _)| i)?;
        Some(self.anchors.remove(pos))
    }

    pub fn delete_anchor(&mut self, anchor_id: &str) -> Result<Anchor, AnchorEditError> {
        let pos = self
            .anchors
            .iter()
            .position(|a| a.id == anchor_id)
            .ok_or_else(|| AnchorEditError::UnknownAnchor(anchor_id.to_string()))?;
        Ok(self.anchors.remove(pos))
    }

    /// Re-time an anchor
    pub fn move_anchor(&mut self, anchor_id: &str, time_ms: u64) -> Result<&Anchor, AnchorEditError> {
        let anchor = self
            .anchors
            .iter_mut()
            .find(|a| a.id == anchor_id)
            .ok_or_else(|| AnchorEditError::UnknownAnchor(anchor_id.to_string()))?;
        anchor.time_ms = time_ms;
        Ok(anchor)
    }

    /// Drop every anchor, returning them. Sequence numbers keep counting.
    pub fn clear(&mut self) -> Vec<Anchor> {
        std::mem::take(&mut self.anchors)
    }

    /// Create anchors for the markers already present in the document.
    /// Times come from the marker's `time` attribute, else from the word.
    pub fn seed_from_markers(&mut self, document: &Document, table: &AlignmentTable) -> usize {
        let mut seeded = 0;
        for marker in document.anchor_markers() {
            if self.get(&marker.marker_id).is_some() {
                continue;
            }
            let Ok((label, order)) = word_at(document, &marker.word_id) else {
                continue;
            };
            let time_ms = marker
                .attributes
                .get("time")
                .and_then(parse_clock_ms)
                .or_else(|| boundary_time(document, table, &marker.word_id, order, marker.placement));
            let Some(time_ms) = time_ms else {
                log::warn!("anchor marker '{}' has no usable time, skipping", marker.marker_id);
                continue;
            };

            let seq = self.take_seq();
            self.anchors.push(Anchor {
                id: marker.marker_id,
                unit_id: marker.word_id,
                placement: marker.placement,
                time_ms,
                label,
                color: color_for(seq as usize).to_string(),
                seq,
                boundary: boundary_index(order, marker.placement),
            });
            seeded += 1;
        }
        if seeded > 0 {
            log::info!("seeded {} anchor(s) from document markers", seeded);
        }
        seeded
    }

    pub fn validate_ordering(&self) -> Result<(), ExportError> {
        validate_ordering(&self.anchors)
    }

    /// Next sequence number whose anchor id is used neither by an anchor
    /// nor by a unit in the document. Seeded markers keep their own ids,
    /// which may collide with freshly built ones.
    fn fresh_id(&mut self, document: &Document, unit_id: &str) -> (u32, String) {
        loop {
            let seq = self.take_seq();
            let id = Anchor::make_id(unit_id, seq);
            if self.get(&id).is_none() && document.locate(&id).is_none() {
                return (seq, id);
            }
            log::debug!("anchor id {} already taken", id);
        }
    }

    fn take_seq(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Sort a copy of `anchors` into document order
pub fn sorted(anchors: &[Anchor]) -> Vec<Anchor> {
    let mut ordered = anchors.to_vec();
    ordered.sort_by_key(Anchor::order_key);
    ordered
}

/// Check that anchor times never go backwards in document order.
///
/// An empty set is refused: there is nothing to export.
pub fn validate_ordering(anchors: &[Anchor]) -> Result<(), ExportError> {
    if anchors.is_empty() {
        return Err(ExportError::NoAnchorsDefined);
    }
    let ordered = sorted(anchors);
    for pair in ordered.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.time_ms < previous.time_ms {
            log::warn!(
                "anchor {} ({} ms) is earlier than {} ({} ms)",
                current.id,
                current.time_ms,
                previous.id,
                previous.time_ms
            );
            return Err(ExportError::AnchorOrderingViolation {
                offending: current.summary(),
                previous: previous.summary(),
            });
        }
    }
    Ok(())
}

/// Text and document order of a word
fn word_at(document: &Document, unit_id: &str) -> Result<(String, usize), AnchorEditError> {
    let unit = document
        .unit(unit_id)
        .ok_or_else(|| AnchorEditError::UnknownUnit(unit_id.to_string()))?;
    let TextUnit::Word { text, .. } = unit else {
        return Err(AnchorEditError::NotAWord(unit_id.to_string()));
    };
    let order = document
        .word_order(unit_id)
        .ok_or_else(|| AnchorEditError::NotAWord(unit_id.to_string()))?;
    Ok((text.clone(), order))
}

fn boundary_index(order: usize, placement: Placement) -> usize {
    match placement {
        Placement::Before => order,
        Placement::After => order + 1,
    }
}

fn boundary_time(
    document: &Document,
    table: &AlignmentTable,
    unit_id: &str,
    order: usize,
    placement: Placement,
) -> Option<u64> {
    let own_start = table.lookup(unit_id).map(|iv| iv.start_ms);
    match placement {
        Placement::Before => own_start,
        Placement::After => document
            .word_ids()
            .iter()
            .skip(order + 1)
            .find_map(|id| table.lookup(id))
            .map(|iv| iv.start_ms)
            .or(own_start),
    }
}
