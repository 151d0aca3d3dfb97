/*!
 * Tests for DOCX packaging of formatted reports
 */

use std::io::{Cursor, Read};

use chrono::{TimeZone, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use eventdesk::app_config::ReportStyle;
use eventdesk::report::docx::DOCX_CONTENT_TYPE;
use eventdesk::report::{DocxRenderer, format_report};

use crate::common::SAMPLE_REPORT;

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}

/// Text of every `w:t` element, paired with whether its run is bold
fn runs(document_xml: &str) -> Vec<(String, bool)> {
    let mut reader = Reader::from_str(document_xml);
    let mut runs = Vec::new();
    let mut bold = false;
    let mut in_text = false;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"w:r" => bold = false,
            Event::Empty(e) if e.name().as_ref() == b"w:b" => bold = true,
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::Text(t) if in_text => runs.push((t.unescape().unwrap().into_owned(), bold)),
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Eof => break,
            _ => {}
        }
    }
    runs
}

#[test]
fn test_render_sampleReport_shouldKeepRunOrderAndWeight() {
    let generated_at = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
    let document = format_report(SAMPLE_REPORT, generated_at);
    let bytes = DocxRenderer::default().render(&document).unwrap();

    let xml = read_part(&bytes, "word/document.xml");
    assert_eq!(
        runs(&xml),
        vec![
            ("Supplier Report".to_string(), false),
            ("Generated on: 2026-01-05 08:00 UTC".to_string(), false),
            ("Event Overview".to_string(), false),
            ("The event \"".to_string(), false),
            ("Gala".to_string(), true),
            ("\" is scheduled for ".to_string(), false),
            ("2024-04-01".to_string(), true),
            (".".to_string(), false),
        ]
    );
}

#[test]
fn test_render_withCustomStyle_shouldWriteFontAndSizes() {
    let renderer = DocxRenderer::new(ReportStyle {
        font_family: "Georgia".to_string(),
        body_size_pt: 12,
        title_size_pt: 20,
        heading_size_pt: 14,
        spacing_after_twips: 120,
    });
    let bytes = renderer
        .render(&format_report("### Budget\nok", Utc::now()))
        .unwrap();

    let styles = read_part(&bytes, "word/styles.xml");
    assert!(styles.contains(r#"w:ascii="Georgia""#));
    assert!(styles.contains(r#"<w:sz w:val="40"/>"#));
    assert!(styles.contains(r#"<w:sz w:val="28"/>"#));

    let document = read_part(&bytes, "word/document.xml");
    assert!(document.contains(r#"<w:spacing w:after="120"/>"#));
}

#[test]
fn test_render_contentTypes_shouldDeclareMainDocument() {
    let bytes = DocxRenderer::default()
        .render(&format_report("", Utc::now()))
        .unwrap();
    let content_types = read_part(&bytes, "[Content_Types].xml");
    assert!(content_types.contains("/word/document.xml"));
    assert!(DOCX_CONTENT_TYPE.ends_with("wordprocessingml.document"));
}
