//! Alignment table: unit id -> time interval in the recording
//!
//! Entries keep insertion order. `resolve_at` scans that order and uses the
//! next entry's start as the exclusive bound, so callers must make sure the
//! insertion order matches temporal order (see `ordering_violation`).

use serde::Serialize;
use std::collections::HashMap;

use super::document::Document;

/// Reserved key for the whole-recording entry
pub const WHOLE_RECORDING: &str = "all";

/// Time interval in milliseconds
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl Interval {
    pub fn new(start_ms: u64, duration_ms: u64) -> Self {
        Self { start_ms, duration_ms }
    }

    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }

    pub fn contains(&self, ms: u64) -> bool {
        ms >= self.start_ms && ms < self.end_ms()
    }
}

#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentTable {
    entries: Vec<(String, Interval)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    whole: Option<Interval>,
    /// Text document reference shared by every entry (part before `#`)
    pub text_src: Option<String>,
    /// Audio file the clips refer to
    pub audio_src: Option<String>,
}

impl PartialEq for AlignmentTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
            && self.whole == other.whole
            && self.text_src == other.text_src
            && self.audio_src == other.audio_src
    }
}

impl AlignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry. An overwritten id keeps its original
    /// position. Returns true if an existing entry was replaced.
    pub fn insert(&mut self, id: impl Into<String>, interval: Interval) -> bool {
        let id = id.into();
        if id == WHOLE_RECORDING {
            self.whole = Some(interval);
            return false;
        }
        match self.index.get(&id) {
            Some(&pos) => {
                self.entries[pos].1 = interval;
                true
            }
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, interval));
                false
            }
        }
    }

    /// Install the whole-recording entry once the audio duration is known
    pub fn install_whole_recording(&mut self, total_duration_ms: u64) {
        self.whole = Some(Interval::new(0, total_duration_ms));
    }

    pub fn lookup(&self, id: &str) -> Option<Interval> {
        if id == WHOLE_RECORDING {
            return self.whole;
        }
        self.index.get(id).map(|&pos| self.entries[pos].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Total recording length; only known after `install_whole_recording`
    pub fn total_duration_ms(&self) -> Option<u64> {
        self.whole.map(|w| w.duration_ms)
    }

    /// Number of real entries (the whole-recording entry is not counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Real entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Interval)> {
        self.entries.iter().map(|(id, iv)| (id.as_str(), *iv))
    }

    /// Unit active at `seconds` into the recording
    pub fn resolve_at(&self, seconds: f64) -> Option<&str> {
        if !seconds.is_finite() {
            return None;
        }
        self.resolve_at_ms((seconds * 1000.0).round() as i64)
    }

    /// Unit whose `[start, next start)` interval contains `ms`.
    ///
    /// The last entry extends to the end of the whole-recording entry when
    /// installed, otherwise to its own end.
    pub fn resolve_at_ms(&self, ms: i64) -> Option<&str> {
        if ms < 0 {
            return None;
        }
        let ms = ms as u64;
        let last = self.entries.len().checked_sub(1)?;
        for (i, (id, interval)) in self.entries.iter().enumerate() {
            let upper = if i < last {
                self.entries[i + 1].1.start_ms
            } else {
                self.whole
                    .map(|w| w.end_ms())
                    .unwrap_or_else(|| interval.end_ms())
            };
            if ms >= interval.start_ms && ms < upper {
                return Some(id);
            }
        }
        None
    }

    /// First pair of consecutive entries whose starts go backwards
    pub fn ordering_violation(&self) -> Option<(&str, &str)> {
        self.entries
            .windows(2)
            .find(|pair| pair[1].1.start_ms < pair[0].1.start_ms)
            .map(|pair| (pair[0].0.as_str(), pair[1].0.as_str()))
    }

    /// Same check, walking aligned words in document order instead of
    /// insertion order
    pub fn document_ordering_violation<'a>(&self, document: &'a Document) -> Option<(&'a str, &'a str)> {
        let mut previous: Option<(&str, u64)> = None;
        for id in document.word_ids() {
            let Some(interval) = self.lookup(id) else {
                continue;
            };
            if let Some((prev_id, prev_start)) = previous {
                if interval.start_ms < prev_start {
                    return Some((prev_id, id.as_str()));
                }
            }
            previous = Some((id.as_str(), interval.start_ms));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> AlignmentTable {
        let mut table = AlignmentTable::new();
        table.insert("w0", Interval::new(0, 500));
        table.insert("w1", Interval::new(500, 700));
        table.insert("w2", Interval::new(1200, 300));
        table.install_whole_recording(1500);
        table
    }

    #[test]
    fn test_resolve_inside_intervals() {
        let table = scenario();
        assert_eq!(table.resolve_at(0.6), Some("w1"));
        assert_eq!(table.resolve_at(0.0), Some("w0"));
        assert_eq!(table.resolve_at(1.2), Some("w2"));
        assert_eq!(table.resolve_at(1.45), Some("w2"));
    }

    #[test]
    fn test_resolve_uses_next_start_as_bound() {
        let table = scenario();
        assert_eq!(table.resolve_at(1.0), Some("w1"));
        assert_eq!(table.resolve_at(1.199), Some("w1"));
    }

    #[test]
    fn test_resolve_outside_recording() {
        let table = scenario();
        assert_eq!(table.resolve_at(-0.1), None);
        assert_eq!(table.resolve_at(1.5), None);
        assert_eq!(table.resolve_at(f64::NAN), None);
        assert_eq!(AlignmentTable::new().resolve_at(0.0), None);
    }

    #[test]
    fn test_resolve_without_whole_recording_stops_at_last_end() {
        let mut table = scenario();
        table.whole = None;
        assert_eq!(table.resolve_at(1.49), Some("w2"));
        assert_eq!(table.resolve_at(1.5), None);
    }

    #[test]
    fn test_whole_recording_is_not_an_entry() {
        let table = scenario();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(WHOLE_RECORDING), Some(Interval::new(0, 1500)));
        assert_eq!(table.total_duration_ms(), Some(1500));
        assert!(table.iter().all(|(id, _)| id != WHOLE_RECORDING));
    }

    #[test]
    fn test_duplicate_id_overwrites_in_place() {
        let mut table = scenario();
        assert!(table.insert("w0", Interval::new(10, 20)));
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["w0", "w1", "w2"]);
        assert_eq!(table.lookup("w0"), Some(Interval::new(10, 20)));
    }

    #[test]
    fn test_ordering_violation() {
        let mut table = scenario();
        assert_eq!(table.ordering_violation(), None);
        table.insert("w3", Interval::new(100, 10));
        assert_eq!(table.ordering_violation(), Some(("w2", "w3")));
    }
}
