/*!
 * Minimal WordprocessingML writer for report documents.
 *
 * The package holds exactly five parts: content types, the package
 * relationships, the main document, its relationships, and a style sheet
 * defining `Normal`, `Title` and `Heading1`.
 */

use std::io::{Cursor, Write};

use log::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::model::{Block, HeadingLevel, ReportDocument, Span};
use crate::app_config::ReportStyle;
use crate::errors::ReportError;

/// MIME type of a `.docx` package
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// File name for a single event report
pub const EVENT_REPORT_FILENAME: &str = "event-report.docx";

/// File name for the all-suppliers report
pub const SUPPLIER_REPORT_FILENAME: &str = "supplier-report.docx";

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const PACKAGE_RELS_PART: &str = "_rels/.rels";
const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const STYLES_PART: &str = "word/styles.xml";

/// Renders a [`ReportDocument`] into `.docx` bytes.
#[derive(Debug, Clone, Default)]
pub struct DocxRenderer {
    style: ReportStyle,
}

impl DocxRenderer {
    pub fn new(style: ReportStyle) -> Self {
        Self { style }
    }

    /// Names of the parts written into every package, in write order.
    pub fn part_names() -> [&'static str; 5] {
        [
            CONTENT_TYPES_PART,
            PACKAGE_RELS_PART,
            DOCUMENT_PART,
            DOCUMENT_RELS_PART,
            STYLES_PART,
        ]
    }

    /// Render the document into an in-memory zip package.
    pub fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        let document_xml = self.document_xml(document);
        let styles_xml = self.styles_xml();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, &str); 5] = [
            (CONTENT_TYPES_PART, content_types_xml()),
            (PACKAGE_RELS_PART, rels_xml()),
            (DOCUMENT_PART, &document_xml),
            (DOCUMENT_RELS_PART, word_rels_xml()),
            (STYLES_PART, &styles_xml),
        ];

        for (name, content) in parts {
            zip.start_file(name, opt)?;
            zip.write_all(content.as_bytes())?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!(
            "Rendered docx with {} blocks ({} bytes)",
            document.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Build `word/document.xml` for the given document.
    pub fn document_xml(&self, document: &ReportDocument) -> String {
        let mut body = String::new();
        for block in &document.blocks {
            match block {
                Block::Heading { text, level } => self.push_heading(&mut body, text, *level),
                Block::Paragraph { spans } => self.push_paragraph(&mut body, spans),
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>"#
        )
    }

    fn push_heading(&self, body: &mut String, text: &str, level: HeadingLevel) {
        let after = self.style.spacing_after_twips;
        match level {
            HeadingLevel::Title => body.push_str(&format!(
                r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/><w:spacing w:after="{after}"/></w:pPr>"#
            )),
            HeadingLevel::Section => body.push_str(&format!(
                r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/><w:spacing w:after="{after}"/></w:pPr>"#
            )),
        }
        push_run(body, text, false);
        body.push_str("</w:p>");
    }

    fn push_paragraph(&self, body: &mut String, spans: &[Span]) {
        body.push_str(&format!(
            r#"<w:p><w:pPr><w:spacing w:after="{}"/></w:pPr>"#,
            self.style.spacing_after_twips
        ));
        for span in spans {
            // Zero-length runs carry no visible text
            if span.text.is_empty() {
                continue;
            }
            push_run(body, &span.text, span.emphasized);
        }
        body.push_str("</w:p>");
    }

    /// Style sheet with sizes in half-points.
    pub fn styles_xml(&self) -> String {
        let font = escape_text(&self.style.font_family);
        let body = self.style.body_size_pt * 2;
        let title = self.style.title_size_pt * 2;
        let heading = self.style.heading_size_pt * 2;

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:sz w:val="{body}"/></w:rPr></w:rPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Title">
    <w:name w:val="Title"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
    <w:rPr><w:b/><w:sz w:val="{title}"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="240"/><w:outlineLvl w:val="0"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="{heading}"/></w:rPr>
  </w:style>
</w:styles>"#
        )
    }
}

fn push_run(body: &mut String, text: &str, bold: bool) {
    body.push_str("<w:r>");
    if bold {
        body.push_str("<w:rPr><w:b/></w:rPr>");
    }
    body.push_str(r#"<w:t xml:space="preserve">"#);
    body.push_str(&escape_text(text));
    body.push_str("</w:t></w:r>");
}

/// XML-escape text, dropping control characters XML 1.0 cannot carry.
pub fn escape_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
}

fn word_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::builder::format_report;
    use chrono::{TimeZone, Utc};
    use std::io::Read;

    fn sample_document() -> ReportDocument {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        format_report("### Budget\nTotal: **5,000 USD** for <A&B>", at)
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_render_shouldWriteAllParts() {
        let bytes = DocxRenderer::default().render(&sample_document()).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in DocxRenderer::part_names() {
            assert!(names.contains(&part), "missing part {}", part);
        }
        assert_eq!(archive.len(), 5);
    }

    #[test]
    fn test_render_shouldStyleTitleAndHeadings() {
        let bytes = DocxRenderer::default().render(&sample_document()).unwrap();
        let xml = read_part(&bytes, DOCUMENT_PART);
        assert!(xml.contains(r#"<w:pStyle w:val="Title"/><w:jc w:val="center"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains("Supplier Report"));
        assert!(xml.contains("Generated on: 2024-03-15 09:30 UTC"));
    }

    #[test]
    fn test_render_withEmphasis_shouldEmitBoldRun() {
        let xml = DocxRenderer::default().document_xml(&sample_document());
        assert!(xml.contains(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">5,000 USD</w:t></w:r>"#
        ));
    }

    #[test]
    fn test_render_withMarkupCharacters_shouldEscape() {
        let xml = DocxRenderer::default().document_xml(&sample_document());
        assert!(xml.contains("&lt;A&amp;B&gt;"));
        assert!(!xml.contains("<A&B>"));
    }

    #[test]
    fn test_escapeText_withControlCharacters_shouldDropThem() {
        assert_eq!(escape_text("a\u{0007}b\tc"), "ab\tc");
    }

    #[test]
    fn test_stylesXml_shouldUseHalfPointSizes() {
        let style = ReportStyle {
            font_family: "Arial".to_string(),
            body_size_pt: 10,
            title_size_pt: 18,
            heading_size_pt: 14,
            spacing_after_twips: 120,
        };
        let xml = DocxRenderer::new(style).styles_xml();
        assert!(xml.contains(r#"w:ascii="Arial""#));
        assert!(xml.contains(r#"<w:sz w:val="20"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="36"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="28"/>"#));
    }

    #[test]
    fn test_documentXml_shouldBeWellFormed() {
        use quick_xml::Reader;
        use quick_xml::events::Event;

        let xml = DocxRenderer::default().document_xml(&sample_document());
        let mut reader = Reader::from_str(&xml);
        let mut paragraphs = 0;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => paragraphs += 1,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("invalid xml: {}", e),
            }
        }
        assert_eq!(paragraphs, 4);
    }
}
