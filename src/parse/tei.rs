//! Text document parser and writer
//!
//! Reads a TEI-style document into the `Document` tree using roxmltree:
//!
//! ```text
//! div[@type="page"] (id, optional graphic/@url)
//!   p
//!     s (optional xml:lang / lang, optional class="translation")
//!       w (id) | text | other inline elements | anchor
//! ```
//!
//! Parsing never fails outright. Malformed input yields an empty document and
//! unsupported nodes are skipped, so the renderer always has something to show.

use roxmltree::{Document as XmlDocument, Node, ParsingOptions};

use super::clock::format_seconds;
use crate::errors::ParseError;
use crate::models::document::ANCHOR_TAG;
use crate::models::{Attributes, Document, Page, Paragraph, Sentence, TextUnit};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse text source into a document, degrading to an empty document on
/// malformed XML
pub fn parse_tei(source: &str) -> Document {
    match try_parse_tei(source) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("text parse failed, returning empty document: {}", e);
            Document::default()
        }
    }
}

/// Parse text source, reporting XML well-formedness errors
pub fn try_parse_tei(source: &str) -> Result<Document, ParseError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let xml = XmlDocument::parse_with_options(source, options)
        .map_err(|e| ParseError::InvalidXml(e.to_string()))?;

    let pages: Vec<Page> = xml
        .descendants()
        .filter(|n| is_element(n, "div") && n.attribute("type") == Some("page"))
        .enumerate()
        .map(|(index, node)| parse_page(node, index))
        .collect();

    log::debug!("parsed {} page(s) of text", pages.len());
    Ok(Document::new(pages))
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// `id` or `xml:id`
fn element_id(node: &Node) -> Option<String> {
    node.attribute("id")
        .or_else(|| node.attribute((XML_NS, "id")))
        .map(str::to_string)
}

fn collect_attributes(node: &Node) -> Attributes {
    node.attributes()
        .map(|attr| {
            let name = if attr.namespace() == Some(XML_NS) {
                format!("xml:{}", attr.name())
            } else {
                attr.name().to_string()
            };
            (name, attr.value().to_string())
        })
        .collect()
}

fn text_content(node: &Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn parse_page(node: Node, index: usize) -> Page {
    let id = element_id(&node).unwrap_or_else(|| {
        let fallback = format!("page-{}", index);
        log::warn!("page without id, using '{}'", fallback);
        fallback
    });

    let img = node
        .children()
        .find(|n| is_element(n, "graphic"))
        .and_then(|g| g.attribute("url"))
        .map(str::to_string);

    let paragraphs = node
        .children()
        .filter(|n| is_element(n, "p"))
        .enumerate()
        .map(|(p, para)| parse_paragraph(para, &format!("{}p{}", id, p)))
        .collect();

    Page {
        id,
        img,
        attributes: collect_attributes(&node),
        paragraphs,
    }
}

fn parse_paragraph(node: Node, prefix: &str) -> Paragraph {
    let mut sentences: Vec<Sentence> = Vec::new();
    // Anchors sitting between sentences attach to the next sentence
    let mut leading_markers: Vec<TextUnit> = Vec::new();

    for (c, child) in node.children().filter(|n| n.is_element()).enumerate() {
        if is_element(&child, ANCHOR_TAG) {
            leading_markers.push(anchor_marker(&child, &format!("{}anchor{}", prefix, c)));
            continue;
        }
        if !child.has_children() {
            continue;
        }
        let mut sentence = parse_sentence(child, &format!("{}s{}", prefix, c));
        if !leading_markers.is_empty() {
            let mut units = std::mem::take(&mut leading_markers);
            units.append(&mut sentence.units);
            sentence.units = units;
        }
        sentences.push(sentence);
    }

    if !leading_markers.is_empty() {
        match sentences.last_mut() {
            Some(last) => last.units.append(&mut leading_markers),
            None => log::debug!("dropping {} anchor(s) in empty paragraph", leading_markers.len()),
        }
    }

    Paragraph {
        attributes: collect_attributes(&node),
        sentences,
    }
}

fn parse_sentence(node: Node, fallback_prefix: &str) -> Sentence {
    let prefix = element_id(&node).unwrap_or_else(|| fallback_prefix.to_string());
    let mut units = Vec::new();

    for (c, child) in node.children().enumerate() {
        if child.is_text() {
            let text = child.text().unwrap_or_default();
            units.push(TextUnit::text_node(format!("{}text{}", prefix, c), text));
        } else if is_element(&child, "w") {
            let text = text_content(&child);
            match element_id(&child) {
                Some(id) => units.push(TextUnit::Word {
                    id,
                    text,
                    attributes: collect_attributes(&child),
                }),
                None => {
                    log::debug!("word without id in '{}', keeping it as plain text", prefix);
                    units.push(TextUnit::NonWord {
                        id: format!("{}text{}", prefix, c),
                        text,
                        attributes: collect_attributes(&child),
                        tag: Some("w".to_string()),
                    });
                }
            }
        } else if is_element(&child, ANCHOR_TAG) {
            units.push(anchor_marker(&child, &format!("{}anchor{}", prefix, c)));
        } else if child.is_element() {
            let text = text_content(&child);
            if text.is_empty() {
                log::debug!("skipping empty <{}> in '{}'", child.tag_name().name(), prefix);
                continue;
            }
            units.push(TextUnit::NonWord {
                id: element_id(&child).unwrap_or_else(|| format!("{}text{}", prefix, c)),
                text,
                attributes: collect_attributes(&child),
                tag: Some(child.tag_name().name().to_string()),
            });
        }
    }

    Sentence {
        attributes: collect_attributes(&node),
        units,
    }
}

fn anchor_marker(node: &Node, fallback_id: &str) -> TextUnit {
    let mut attributes = collect_attributes(node);
    let id = element_id(node).unwrap_or_else(|| {
        attributes.set("id", fallback_id);
        fallback_id.to_string()
    });
    TextUnit::anchor_marker(id, attributes)
}

// ============================================================================
// Writer
// ============================================================================

/// Escape special XML characters
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn push_attributes(buffer: &mut String, attributes: &Attributes) {
    for (name, value) in attributes.iter() {
        buffer.push_str(&format!(" {}=\"{}\"", name, xml_escape(value)));
    }
}

fn has_id(attributes: &Attributes) -> bool {
    attributes.get("id").is_some() || attributes.get("xml:id").is_some()
}

/// Attributes for a synthetic anchor marker
pub fn anchor_marker_attributes(anchor_id: &str, time_ms: u64) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.set("id", anchor_id);
    attributes.set("time", format!("{}s", format_seconds(time_ms)));
    attributes
}

/// Serialize a document, including anchor markers, back to the text format
pub fn write_tei(document: &Document) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<TEI>\n  <text>\n    <body>\n");

    for page in &document.pages {
        out.push_str("      <div");
        if page.attributes.get("type").is_none() {
            out.push_str(" type=\"page\"");
        }
        if !has_id(&page.attributes) {
            out.push_str(&format!(" id=\"{}\"", xml_escape(&page.id)));
        }
        push_attributes(&mut out, &page.attributes);
        out.push_str(">\n");

        if let Some(img) = &page.img {
            out.push_str(&format!("        <graphic url=\"{}\"/>\n", xml_escape(img)));
        }

        for paragraph in &page.paragraphs {
            out.push_str("        <p");
            push_attributes(&mut out, &paragraph.attributes);
            out.push_str(">\n");
            for sentence in &paragraph.sentences {
                out.push_str("          <s");
                push_attributes(&mut out, &sentence.attributes);
                out.push('>');
                for unit in &sentence.units {
                    write_unit(&mut out, unit);
                }
                out.push_str("</s>\n");
            }
            out.push_str("        </p>\n");
        }
        out.push_str("      </div>\n");
    }

    out.push_str("    </body>\n  </text>\n</TEI>\n");
    out
}

fn write_unit(out: &mut String, unit: &TextUnit) {
    match unit {
        TextUnit::Word { id, text, attributes } => {
            out.push_str("<w");
            if !has_id(attributes) {
                out.push_str(&format!(" id=\"{}\"", xml_escape(id)));
            }
            push_attributes(out, attributes);
            out.push_str(&format!(">{}</w>", xml_escape(text)));
        }
        TextUnit::NonWord { text, tag: None, .. } => out.push_str(&xml_escape(text)),
        TextUnit::NonWord { attributes, tag: Some(tag), text, .. } => {
            out.push('<');
            out.push_str(tag);
            push_attributes(out, attributes);
            if text.is_empty() {
                out.push_str("/>");
            } else {
                out.push_str(&format!(">{}</{}>", xml_escape(text), tag));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<TEI>
  <text xml:lang="dan">
    <body>
      <div type="page" id="t0b0d0" class="intro">
        <graphic url="ajax.png"/>
        <p id="t0b0d0p0">
          <s id="t0b0d0p0s0"><w id="t0b0d0p0s0w0">Hello</w>, <w id="t0b0d0p0s0w1">world</w><unknown/><foo>!</foo></s>
          <s xml:lang="eng" class="translation">Hi there</s>
        </p>
      </div>
      <div type="page" id="t0b0d1">
        <p><s><w xml:id="t0b0d1p0s0w0">Again</w></s></p>
      </div>
    </body>
  </text>
</TEI>"#;

    #[test]
    fn test_parse_pages_and_images() {
        let doc = parse_tei(SAMPLE);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0].id, "t0b0d0");
        assert_eq!(doc.pages[0].img.as_deref(), Some("ajax.png"));
        assert_eq!(doc.pages[0].attributes.class(), Some("intro"));
        assert!(doc.pages[1].img.is_none());
    }

    #[test]
    fn test_parse_words_and_non_words() {
        let doc = parse_tei(SAMPLE);
        let sentence = &doc.pages[0].paragraphs[0].sentences[0];
        let words: Vec<&str> = sentence.units.iter().filter(|u| u.is_word()).map(|u| u.text()).collect();
        assert_eq!(words, vec!["Hello", "world"]);
        assert_eq!(sentence.units[1].text(), ", ");
        assert_eq!(sentence.units[1].id(), "t0b0d0p0s0text1");
        // <unknown/> carries no text and is skipped, <foo> is kept
        assert_eq!(sentence.units.len(), 4);
        assert_eq!(sentence.units[3].text(), "!");
    }

    #[test]
    fn test_parse_sentence_language_and_translation() {
        let doc = parse_tei(SAMPLE);
        let translation = &doc.pages[0].paragraphs[0].sentences[1];
        assert_eq!(translation.lang(), Some("eng"));
        assert!(translation.is_translation());
        assert!(doc.has_translations());
    }

    #[test]
    fn test_parse_xml_id_words() {
        let doc = parse_tei(SAMPLE);
        assert_eq!(doc.word_order("t0b0d1p0s0w0"), Some(2));
        assert_eq!(doc.page_of("t0b0d1p0s0w0"), Some("t0b0d1"));
    }

    #[test]
    fn test_malformed_xml_yields_empty_document() {
        assert!(parse_tei("<TEI><div type=\"page\">").is_empty());
        assert!(try_parse_tei("not xml").is_err());
        assert!(parse_tei("<TEI/>").is_empty());
    }

    #[test]
    fn test_paragraph_level_anchor_attaches_to_next_sentence() {
        let src = r#"<TEI><div type="page" id="pg"><p><anchor id="a0" time="1.5s"/><s><w id="w0">x</w></s></p></div></TEI>"#;
        let doc = parse_tei(src);
        let markers = doc.anchor_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].marker_id, "a0");
        assert_eq!(markers[0].word_id, "w0");
        assert_eq!(markers[0].attributes.get("time"), Some("1.5s"));
    }

    #[test]
    fn test_write_then_parse_preserves_tree() {
        let doc = parse_tei(SAMPLE);
        let written = write_tei(&doc);
        let reparsed = parse_tei(&written);
        assert_eq!(reparsed.word_ids(), doc.word_ids());
        assert_eq!(reparsed.pages[0].img, doc.pages[0].img);
        assert_eq!(write_tei(&reparsed), written);
    }

    #[test]
    fn test_write_escapes_text() {
        let src = r#"<TEI><div type="page" id="pg"><p><s><w id="w0">a&amp;b</w></s></p></div></TEI>"#;
        let written = write_tei(&parse_tei(src));
        assert!(written.contains("<w id=\"w0\">a&amp;b</w>"));
    }
}
