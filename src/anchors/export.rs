//! Alignment export
//!
//! Re-times aligned words piecewise-linearly between anchor boundaries and
//! writes the result as a new alignment document.
//!
//! Control points are `(boundary, original ms, target ms)`:
//!
//! ```text
//! start     (0,        S,           min(S, t0))
//! anchor k  (b_k,      O(b_k),      t_k)        one point per boundary, last wins
//! end       (-,        E,           max(E, t_last))
//! ```
//!
//! `S`/`E` are the first word's start and the last word's end, `O(b)` is the
//! start of the first aligned word at or after boundary `b`. A word belongs to
//! the segment of the last point whose boundary is not past it. Exporting the
//! re-imported output with the same anchors maps every point onto itself, so
//! the second export is byte-identical.

use super::editor::{sorted, validate_ordering};
use crate::errors::ExportError;
use crate::models::{AlignmentTable, Anchor, Document, Interval};
use crate::parse::write_smil;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ControlPoint {
    boundary: usize,
    original_ms: u64,
    target_ms: u64,
}

/// Regenerate the alignment table from the document's aligned words and the
/// anchor set
pub fn retime(
    document: &Document,
    table: &AlignmentTable,
    anchors: &[Anchor],
) -> Result<AlignmentTable, ExportError> {
    validate_ordering(anchors)?;

    let words: Vec<(&str, usize, Interval)> = document
        .word_ids()
        .iter()
        .enumerate()
        .filter_map(|(order, id)| table.lookup(id).map(|iv| (id.as_str(), order, iv)))
        .collect();

    let mut out = AlignmentTable::new();
    out.text_src = table.text_src.clone();
    out.audio_src = table.audio_src.clone();

    let skipped = table.iter().filter(|(id, _)| document.word_order(id).is_none()).count();
    if skipped > 0 {
        log::debug!("dropping {} alignment entries with no word in the document", skipped);
    }

    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return Ok(out);
    };
    let start_ms = first.2.start_ms;
    let end_ms = last.2.end_ms();

    let points = control_points(&words, &sorted(anchors), start_ms, end_ms);

    for (id, order, interval) in &words {
        let k = points
            .iter()
            .rposition(|p| p.boundary <= *order)
            .unwrap_or(0);
        let from = points[k];
        let to = points[k + 1];
        let begin = map_time(interval.start_ms, from, to);
        let end = map_time(interval.end_ms(), from, to);
        out.insert(*id, Interval::new(begin, end.saturating_sub(begin)));
    }

    Ok(out)
}

/// Re-time and serialize. Refused when there are no anchors or their times
/// go backwards in document order.
pub fn export_alignment(
    document: &Document,
    table: &AlignmentTable,
    anchors: &[Anchor],
) -> Result<String, ExportError> {
    match retime(document, table, anchors) {
        Ok(retimed) => {
            log::info!("exported alignment with {} anchor(s)", anchors.len());
            Ok(write_smil(&retimed))
        }
        Err(e) => {
            log::warn!("alignment export refused: {}", e);
            Err(e)
        }
    }
}

/// Start point, one point per anchor boundary, end point. The end point's
/// boundary is never consulted.
fn control_points(
    words: &[(&str, usize, Interval)],
    anchors: &[Anchor],
    start_ms: u64,
    end_ms: u64,
) -> Vec<ControlPoint> {
    let first_target = anchors.first().map(|a| a.time_ms).unwrap_or(start_ms);
    let mut points = vec![ControlPoint {
        boundary: 0,
        original_ms: start_ms,
        target_ms: start_ms.min(first_target),
    }];

    for anchor in anchors {
        let original = words
            .iter()
            .find(|(_, order, _)| *order >= anchor.boundary)
            .map(|(_, _, iv)| iv.start_ms)
            .unwrap_or(end_ms);
        let previous_original = points.last().map(|p| p.original_ms).unwrap_or(start_ms);
        let point = ControlPoint {
            boundary: anchor.boundary,
            original_ms: original.max(previous_original),
            target_ms: anchor.time_ms,
        };
        match points.last_mut() {
            Some(last) if last.boundary == point.boundary => *last = point,
            _ => points.push(point),
        }
    }

    let last = points.last().copied().unwrap_or(ControlPoint {
        boundary: 0,
        original_ms: start_ms,
        target_ms: start_ms,
    });
    points.push(ControlPoint {
        boundary: usize::MAX,
        original_ms: end_ms.max(last.original_ms),
        target_ms: end_ms.max(last.target_ms),
    });
    points
}

/// Linear map of `ms` from `[from.original, to.original]` onto
/// `[from.target, to.target]`, clamped to the segment
fn map_time(ms: u64, from: ControlPoint, to: ControlPoint) -> u64 {
    let span_in = to.original_ms.saturating_sub(from.original_ms);
    if span_in == 0 {
        return from.target_ms;
    }
    let offset = ms.clamp(from.original_ms, to.original_ms) - from.original_ms;
    let span_out = to.target_ms.saturating_sub(from.target_ms) as u128;
    let mapped = (offset as u128 * span_out + span_in as u128 / 2) / span_in as u128;
    from.target_ms + mapped as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::AnchorEditor;
    use crate::models::{Attributes, Page, Paragraph, Sentence, TextUnit};
    use crate::parse::parse_smil;

    fn document() -> Document {
        let words = ["w0", "w1", "w2", "w3"];
        Document::new(vec![Page {
            id: "p1".into(),
            img: None,
            attributes: Attributes::new(),
            paragraphs: vec![Paragraph {
                attributes: Attributes::new(),
                sentences: vec![Sentence {
                    attributes: Attributes::new(),
                    units: words.iter().map(|w| TextUnit::word(*w, *w)).collect(),
                }],
            }],
        }])
    }

    fn table() -> AlignmentTable {
        let mut table = AlignmentTable::new();
        table.text_src = Some("text.xml".into());
        table.audio_src = Some("audio.mp3".into());
        table.insert("w0", Interval::new(0, 500));
        table.insert("w1", Interval::new(500, 500));
        table.insert("w2", Interval::new(1000, 500));
        table.insert("w3", Interval::new(1500, 500));
        table
    }

    #[test]
    fn test_export_without_anchors_is_refused() {
        assert_eq!(
            export_alignment(&document(), &table(), &[]),
            Err(ExportError::NoAnchorsDefined)
        );
    }

    #[test]
    fn test_anchor_shifts_following_words() {
        let (doc, table) = (document(), table());
        let mut editor = AnchorEditor::new();
        let anchor = editor.insert_before(&doc, &table, "w2").unwrap();
        editor.move_anchor(&anchor.id, 1200).unwrap();

        let retimed = retime(&doc, &table, editor.anchors()).unwrap();
        assert_eq!(retimed.lookup("w0"), Some(Interval::new(0, 600)));
        assert_eq!(retimed.lookup("w1"), Some(Interval::new(600, 600)));
        assert_eq!(retimed.lookup("w2"), Some(Interval::new(1200, 400)));
        assert_eq!(retimed.lookup("w3"), Some(Interval::new(1600, 400)));
    }

    #[test]
    fn test_unmoved_anchors_keep_timing() {
        let (doc, table) = (document(), table());
        let mut editor = AnchorEditor::new();
        editor.insert_before(&doc, &table, "w1").unwrap();
        editor.insert_after(&doc, &table, "w2").unwrap();
        assert_eq!(retime(&doc, &table, editor.anchors()).unwrap(), table);
    }

    #[test]
    fn test_export_is_idempotent_through_reimport() {
        let (doc, table) = (document(), table());
        let mut editor = AnchorEditor::new();
        let a = editor.insert_before(&doc, &table, "w1").unwrap();
        let b = editor.insert_before(&doc, &table, "w3").unwrap();
        editor.move_anchor(&a.id, 333).unwrap();
        editor.move_anchor(&b.id, 1777).unwrap();

        let first = export_alignment(&doc, &table, editor.anchors()).unwrap();
        let second = export_alignment(&doc, &parse_smil(&first), editor.anchors()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_boundary_anchors_use_last() {
        let (doc, table) = (document(), table());
        let mut editor = AnchorEditor::new();
        let a = editor.insert_before(&doc, &table, "w2").unwrap();
        let b = editor.insert_before(&doc, &table, "w2").unwrap();
        editor.move_anchor(&a.id, 900).unwrap();
        editor.move_anchor(&b.id, 1100).unwrap();

        let retimed = retime(&doc, &table, editor.anchors()).unwrap();
        assert_eq!(retimed.lookup("w2").map(|iv| iv.start_ms), Some(1100));

        let first = export_alignment(&doc, &table, editor.anchors()).unwrap();
        let second = export_alignment(&doc, &parse_smil(&first), editor.anchors()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_export_writes_alignment_document() {
        let (doc, table) = (document(), table());
        let mut editor = AnchorEditor::new();
        editor.insert_before(&doc, &table, "w0").unwrap();
        let smil = export_alignment(&doc, &table, editor.anchors()).unwrap();
        assert!(smil.contains("<text src=\"text.xml#w0\"/>"));
        assert!(smil.contains("clipBegin=\"1.500\" clipEnd=\"2.000\""));
    }
}
