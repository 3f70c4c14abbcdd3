//! Document tree: pages -> paragraphs -> sentences -> text units
//!
//! The tree is built once by the text parser. Unit ids are unique across the
//! whole document and are the join key into the alignment table. The only
//! mutation after load is insertion/removal of anchor marker units, which
//! never touches word ids or word order.

use serde::Serialize;
use std::collections::HashMap;

use super::anchor::Placement;

/// Element name used for anchor markers in the text format
pub const ANCHOR_TAG: &str = "anchor";

/// Ordered attribute bag, preserving source order
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn class(&self) -> Option<&str> {
        self.get("class")
    }

    /// True if the whitespace-separated class list contains `name`
    pub fn has_class(&self, name: &str) -> bool {
        self.class()
            .map(|c| c.split_whitespace().any(|part| part == name))
            .unwrap_or(false)
    }

    /// Language tag; a plain `lang` wins over `xml:lang`
    pub fn lang(&self) -> Option<&str> {
        self.get("lang").or_else(|| self.get("xml:lang"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// A word or non-word span inside a sentence
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TextUnit {
    /// Clickable, alignable word
    Word {
        id: String,
        text: String,
        attributes: Attributes,
    },
    /// Punctuation, whitespace, other inline elements and anchor markers.
    /// `tag` is `None` for bare text nodes.
    NonWord {
        id: String,
        text: String,
        attributes: Attributes,
        tag: Option<String>,
    },
}

impl TextUnit {
    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        TextUnit::Word {
            id: id.into(),
            text: text.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn text_node(id: impl Into<String>, text: impl Into<String>) -> Self {
        TextUnit::NonWord {
            id: id.into(),
            text: text.into(),
            attributes: Attributes::new(),
            tag: None,
        }
    }

    /// Synthetic anchor marker unit
    pub fn anchor_marker(id: impl Into<String>, attributes: Attributes) -> Self {
        TextUnit::NonWord {
            id: id.into(),
            text: String::new(),
            attributes,
            tag: Some(ANCHOR_TAG.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TextUnit::Word { id, .. } | TextUnit::NonWord { id, .. } => id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TextUnit::Word { text, .. } | TextUnit::NonWord { text, .. } => text,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            TextUnit::Word { attributes, .. } | TextUnit::NonWord { attributes, .. } => attributes,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, TextUnit::Word { .. })
    }

    pub fn is_anchor_marker(&self) -> bool {
        matches!(self, TextUnit::NonWord { tag: Some(tag), .. } if tag == ANCHOR_TAG)
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence {
    pub attributes: Attributes,
    pub units: Vec<TextUnit>,
}

impl Sentence {
    pub fn lang(&self) -> Option<&str> {
        self.attributes.lang()
    }

    pub fn is_translation(&self) -> bool {
        self.attributes
            .class()
            .map(|c| c.contains("translation"))
            .unwrap_or(false)
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub attributes: Attributes,
    pub sentences: Vec<Sentence>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    pub attributes: Attributes,
    pub paragraphs: Vec<Paragraph>,
}

/// Position of a unit inside the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitLocation {
    pub page: usize,
    pub paragraph: usize,
    pub sentence: usize,
    pub unit: usize,
    /// Document-order index, words only
    pub word_order: Option<usize>,
}

/// Anchor marker found in the tree, resolved to the word it is attached to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerRef {
    pub marker_id: String,
    pub word_id: String,
    pub placement: Placement,
    pub attributes: Attributes,
}

/// Parsed text document
#[derive(Serialize, Clone, Debug, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    #[serde(skip)]
    index: HashMap<String, UnitLocation>,
    #[serde(skip)]
    words: Vec<String>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.pages == other.pages
    }
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        let mut doc = Self {
            pages,
            index: HashMap::new(),
            words: Vec::new(),
        };
        doc.reindex();
        doc
    }

    /// Rebuild the id index. Called after structural changes.
    fn reindex(&mut self) {
        self.index.clear();
        self.words.clear();
        for (p, page) in self.pages.iter().enumerate() {
            for (g, paragraph) in page.paragraphs.iter().enumerate() {
                for (s, sentence) in paragraph.sentences.iter().enumerate() {
                    for (u, unit) in sentence.units.iter().enumerate() {
                        if self.index.contains_key(unit.id()) {
                            log::warn!("duplicate unit id '{}' in document, keeping first", unit.id());
                            continue;
                        }
                        let word_order = if unit.is_word() {
                            self.words.push(unit.id().to_string());
                            Some(self.words.len() - 1)
                        } else {
                            None
                        };
                        let location = UnitLocation {
                            page: p,
                            paragraph: g,
                            sentence: s,
                            unit: u,
                            word_order,
                        };
                        self.index.insert(unit.id().to_string(), location);
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn locate(&self, id: &str) -> Option<UnitLocation> {
        self.index.get(id).copied()
    }

    pub fn unit(&self, id: &str) -> Option<&TextUnit> {
        let loc = self.locate(id)?;
        self.pages
            .get(loc.page)?
            .paragraphs
            .get(loc.paragraph)?
            .sentences
            .get(loc.sentence)?
            .units
            .get(loc.unit)
    }

    /// Id of the page enclosing unit `id`
    pub fn page_of(&self, id: &str) -> Option<&str> {
        let loc = self.locate(id)?;
        self.pages.get(loc.page).map(|p| p.id.as_str())
    }

    pub fn page_index(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == page_id)
    }

    /// Document-order index of a word
    pub fn word_order(&self, id: &str) -> Option<usize> {
        self.locate(id)?.word_order
    }

    /// Word ids in reading order
    pub fn word_ids(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn has_translations(&self) -> bool {
        self.pages
            .iter()
            .flat_map(|p| p.paragraphs.iter())
            .flat_map(|g| g.sentences.iter())
            .any(Sentence::is_translation)
    }

    /// Insert a marker unit directly before or after unit `target`.
    /// Returns false if the target is unknown or the marker id is taken.
    pub fn insert_marker(&mut self, target: &str, placement: Placement, marker: TextUnit) -> bool {
        if self.index.contains_key(marker.id()) {
            return false;
        }
        let Some(loc) = self.locate(target) else {
            return false;
        };
        let Some(units) = self.units_mut(loc) else {
            return false;
        };
        let at = match placement {
            Placement::Before => loc.unit,
            Placement::After => loc.unit + 1,
        };
        units.insert(at, marker);
        self.reindex();
        true
    }

    /// Remove a marker unit by id. Words are never removed.
    pub fn remove_marker(&mut self, marker_id: &str) -> bool {
        let Some(loc) = self.locate(marker_id) else {
            return false;
        };
        let Some(units) = self.units_mut(loc) else {
            return false;
        };
        if !units.get(loc.unit).map(TextUnit::is_anchor_marker).unwrap_or(false) {
            return false;
        }
        units.remove(loc.unit);
        self.reindex();
        true
    }

    /// Set an attribute on a marker unit. Words are never touched.
    pub fn set_marker_attribute(&mut self, marker_id: &str, name: &str, value: impl Into<String>) -> bool {
        let Some(loc) = self.locate(marker_id) else {
            return false;
        };
        let Some(units) = self.units_mut(loc) else {
            return false;
        };
        match units.get_mut(loc.unit) {
            Some(TextUnit::NonWord { attributes, tag: Some(tag), .. }) if tag.as_str() == ANCHOR_TAG => {
                attributes.set(name, value);
                true
            }
            _ => false,
        }
    }

    /// Remove every anchor marker from the tree
    pub fn clear_markers(&mut self) -> usize {
        let mut removed = 0;
        for unit_list in self
            .pages
            .iter_mut()
            .flat_map(|p| p.paragraphs.iter_mut())
            .flat_map(|g| g.sentences.iter_mut())
            .map(|s| &mut s.units)
        {
            let before = unit_list.len();
            unit_list.retain(|u| !u.is_anchor_marker());
            removed += before - unit_list.len();
        }
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Anchor markers in reading order, each attached to the following word
    /// (or, at the very end, to the preceding word).
    pub fn anchor_markers(&self) -> Vec<MarkerRef> {
        let mut found = Vec::new();
        let mut pending: Vec<(String, Attributes)> = Vec::new();
        let mut last_word: Option<&str> = None;

        for unit in self
            .pages
            .iter()
            .flat_map(|p| p.paragraphs.iter())
            .flat_map(|g| g.sentences.iter())
            .flat_map(|s| s.units.iter())
        {
            if unit.is_anchor_marker() {
                pending.push((unit.id().to_string(), unit.attributes().clone()));
            } else if unit.is_word() {
                for (marker_id, attributes) in pending.drain(..) {
                    found.push(MarkerRef {
                        marker_id,
                        word_id: unit.id().to_string(),
                        placement: Placement::Before,
                        attributes,
                    });
                }
                last_word = Some(unit.id());
            }
        }

        if let Some(word) = last_word {
            for (marker_id, attributes) in pending {
                found.push(MarkerRef {
                    marker_id,
                    word_id: word.to_string(),
                    placement: Placement::After,
                    attributes,
                });
            }
        }
        found
    }

    fn units_mut(&mut self, loc: UnitLocation) -> Option<&mut Vec<TextUnit>> {
        self.pages
            .get_mut(loc.page)?
            .paragraphs
            .get_mut(loc.paragraph)?
            .sentences
            .get_mut(loc.sentence)
            .map(|s| &mut s.units)
    }
}
