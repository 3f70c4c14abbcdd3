// Test anchor editing and alignment export through the public API

use readalong_wasm::anchors::{export_alignment, AnchorEditor};
use readalong_wasm::parse::{parse_smil, parse_tei};
use readalong_wasm::{AnchorEditError, ExportError, Placement, ReadAlongConfig, ReadAlongSession};

const TEXT: &str = r#"<TEI><text><body>
  <div type="page" id="pg">
    <p>
      <s id="s0"><w id="s0w0">The</w> <w id="s0w1">quick</w> <w id="s0w2">brown</w> <w id="s0w3">fox</w></s>
    </p>
  </div>
</body></text></TEI>"#;

const ALIGNMENT: &str = r#"<smil><body>
  <par><text src="story.xml#s0w0"/><audio src="story.mp3" clipBegin="0.100" clipEnd="0.400"/></par>
  <par><text src="story.xml#s0w1"/><audio src="story.mp3" clipBegin="0.400" clipEnd="0.900"/></par>
  <par><text src="story.xml#s0w2"/><audio src="story.mp3" clipBegin="0.900" clipEnd="1.300"/></par>
  <par><text src="story.xml#s0w3"/><audio src="story.mp3" clipBegin="1.300" clipEnd="2.000"/></par>
</body></smil>"#;

#[test]
fn test_round_trip_export_is_idempotent() {
    let doc = parse_tei(TEXT);
    let table = parse_smil(ALIGNMENT);
    let mut editor = AnchorEditor::new();
    let first = editor.insert_before(&doc, &table, "s0w1").unwrap();
    let second = editor.insert_after(&doc, &table, "s0w2").unwrap();
    editor.move_anchor(&first.id, 550).unwrap();
    editor.move_anchor(&second.id, 1450).unwrap();

    let exported = export_alignment(&doc, &table, editor.anchors()).unwrap();
    let reimported = parse_smil(&exported);
    assert_eq!(reimported.lookup("s0w1").map(|iv| iv.start_ms), Some(550));
    assert_eq!(reimported.lookup("s0w3").map(|iv| iv.start_ms), Some(1450));
    assert_eq!(reimported.ordering_violation(), None);

    let again = export_alignment(&doc, &reimported, editor.anchors()).unwrap();
    assert_eq!(exported, again);
}

#[test]
fn test_export_refused_on_ordering_violation() {
    let doc = parse_tei(TEXT);
    let table = parse_smil(ALIGNMENT);
    let mut editor = AnchorEditor::new();
    editor.insert_before(&doc, &table, "s0w1").unwrap();
    let late = editor.insert_before(&doc, &table, "s0w3").unwrap();
    editor.move_anchor(&late.id, 200).unwrap();

    let err = export_alignment(&doc, &table, editor.anchors()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The text \"fox\" is earlier than the previous text \"quick\""
    );
}

#[test]
fn test_export_refused_without_anchors() {
    let err = export_alignment(&parse_tei(TEXT), &parse_smil(ALIGNMENT), &[]).unwrap_err();
    assert_eq!(err, ExportError::NoAnchorsDefined);
    assert_eq!(err.to_string(), "There is no anchor setup currently.");
}

#[test]
fn test_session_anchor_workflow() {
    let mut session = ReadAlongSession::new(ReadAlongConfig {
        editable: true,
        ..ReadAlongConfig::default()
    });
    session.load_text(TEXT).unwrap();
    session.load_alignment(ALIGNMENT).unwrap();
    session.audio_loaded(2000);

    assert_eq!(
        session.insert_anchor("s0w0", Placement::Before),
        Err(AnchorEditError::AnchorModeInactive)
    );
    session.toggle_anchor_mode().unwrap();

    let a = session.insert_anchor("s0w0", Placement::Before).unwrap();
    let b = session.insert_anchor("s0w2", Placement::Before).unwrap();
    assert_ne!(a.color, b.color);
    assert_eq!(a.time_ms, 100);
    assert_eq!(b.time_ms, 900);

    let text = session.export_anchored_text();
    assert!(text.contains("<anchor id=\"s0w0anchor0\" time=\"0.100s\"/><w id=\"s0w0\">"));
    assert!(text.contains("<anchor id=\"s0w2anchor1\" time=\"0.900s\"/><w id=\"s0w2\">"));

    session.move_anchor(&b.id, 1000).unwrap();
    let smil = session.export_alignment().unwrap();
    assert!(smil.contains("<text src=\"story.xml#s0w2\"/>"));
    assert!(smil.contains("clipBegin=\"1.000\""));

    assert_eq!(session.delete_anchor_on("s0w2").unwrap().id, b.id);
    assert_eq!(session.anchors().len(), 1);
    assert!(!session.export_anchored_text().contains("s0w2anchor1"));
}
