//! Alignment document parser and writer
//!
//! Reads a SMIL-style alignment with quick-xml:
//!
//! ```text
//! <smil><body>
//!   <par>
//!     <text src="text.xml#w0"/>
//!     <audio src="audio.mp3" clipBegin="0.000" clipEnd="0.500"/>
//!   </par>
//! </body></smil>
//! ```
//!
//! Every `par` contributes one referenced id, one clip begin and one clip end;
//! times are seconds on the wire and integer milliseconds in the table.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::clock::{format_seconds, parse_clock_ms};
use super::tei::xml_escape;
use crate::errors::ParseError;
use crate::models::{AlignmentTable, Interval, WHOLE_RECORDING};

/// One `par` while it is being read
#[derive(Default)]
struct ParEntry {
    id: Option<String>,
    begin_ms: Option<u64>,
    end_ms: Option<u64>,
}

/// Parse alignment source into a table, degrading to an empty table on
/// malformed input
pub fn parse_smil(source: &str) -> AlignmentTable {
    match try_parse_smil(source) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("alignment parse failed, returning empty table: {}", e);
            AlignmentTable::new()
        }
    }
}

/// Parse alignment source, reporting XML errors
pub fn try_parse_smil(source: &str) -> Result<AlignmentTable, ParseError> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut table = AlignmentTable::new();
    let mut saw_root = false;
    let mut current: Option<ParEntry> = None;
    let mut depth_in_par = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::InvalidXml(format!("at {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(ref e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"smil" => saw_root = true,
                    b"par" => {
                        current = Some(ParEntry::default());
                        depth_in_par = 0;
                    }
                    _ => {
                        if let Some(entry) = current.as_mut() {
                            if depth_in_par == 0 {
                                read_par_child(e, entry, &mut table)?;
                            }
                            depth_in_par += 1;
                        }
                    }
                }
            }
            Event::Empty(ref e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"smil" => saw_root = true,
                    b"par" => {}
                    _ => {
                        if let Some(entry) = current.as_mut() {
                            if depth_in_par == 0 {
                                read_par_child(e, entry, &mut table)?;
                            }
                        }
                    }
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"par" {
                    if let Some(entry) = current.take() {
                        finish_par(entry, &mut table);
                    }
                } else if current.is_some() {
                    depth_in_par = depth_in_par.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::MissingRequiredElement("smil".to_string()));
    }
    log::debug!("parsed {} alignment entries", table.len());
    Ok(table)
}

fn attribute_value(element: &BytesStart, name: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidXml(e.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::InvalidXml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn read_par_child(
    element: &BytesStart,
    entry: &mut ParEntry,
    table: &mut AlignmentTable,
) -> Result<(), ParseError> {
    match element.local_name().as_ref() {
        b"text" => {
            if let Some(src) = attribute_value(element, b"src")? {
                let (document, fragment) = match src.rsplit_once('#') {
                    Some((document, fragment)) => (document, fragment),
                    None => ("", src.as_str()),
                };
                if table.text_src.is_none() && !document.is_empty() {
                    table.text_src = Some(document.to_string());
                }
                entry.id = Some(fragment.to_string());
            }
        }
        b"audio" => {
            if let Some(src) = attribute_value(element, b"src")? {
                if table.audio_src.is_none() {
                    table.audio_src = Some(src);
                }
            }
            entry.begin_ms = attribute_value(element, b"clipBegin")?
                .as_deref()
                .and_then(parse_clock_ms);
            entry.end_ms = attribute_value(element, b"clipEnd")?
                .as_deref()
                .and_then(parse_clock_ms);
        }
        _ => {}
    }
    Ok(())
}

fn finish_par(entry: ParEntry, table: &mut AlignmentTable) {
    let (Some(id), Some(begin), Some(end)) = (entry.id, entry.begin_ms, entry.end_ms) else {
        log::warn!("skipping incomplete <par> in alignment");
        return;
    };
    if id.is_empty() || id == WHOLE_RECORDING {
        log::warn!("skipping <par> with reserved or empty id '{}'", id);
        return;
    }
    if end < begin {
        log::warn!("clip for '{}' ends before it begins, clamping duration to 0", id);
    }
    if table.insert(id.clone(), Interval::new(begin, end.saturating_sub(begin))) {
        log::warn!("duplicate alignment id '{}', last entry wins", id);
    }
}

/// Serialize a table back to the alignment format, in table order
pub fn write_smil(table: &AlignmentTable) -> String {
    let text_src = table.text_src.as_deref().unwrap_or("");
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<smil xmlns=\"http://www.w3.org/ns/SMIL\" version=\"3.0\">\n  <body>\n");

    for (id, interval) in table.iter() {
        out.push_str(&format!("    <par id=\"par-{}\">\n", xml_escape(id)));
        out.push_str(&format!(
            "      <text src=\"{}#{}\"/>\n",
            xml_escape(text_src),
            xml_escape(id)
        ));
        out.push_str("      <audio");
        if let Some(audio) = &table.audio_src {
            out.push_str(&format!(" src=\"{}\"", xml_escape(audio)));
        }
        out.push_str(&format!(
            " clipBegin=\"{}\" clipEnd=\"{}\"/>\n",
            format_seconds(interval.start_ms),
            format_seconds(interval.end_ms())
        ));
        out.push_str("    </par>\n");
    }

    out.push_str("  </body>\n</smil>\n");
    out
}
