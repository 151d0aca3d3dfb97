/*!
 * Document tree builder.
 *
 * Turns classified lines into blocks, preceded by the fixed title heading and
 * the generation timestamp paragraph.
 */

use chrono::{DateTime, Utc};

use super::inline::tokenize;
use super::model::{Block, GENERATED_ON_PREFIX, HeadingLevel, Line, REPORT_TITLE, ReportDocument, Span};
use super::splitter::{HEADING_MARKER, split_lines};

/// Format of the timestamp in the lead paragraph
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Builds a [`ReportDocument`] from classified lines.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    generated_at: DateTime<Utc>,
}

impl DocumentBuilder {
    /// Builder stamping documents with the given generation time.
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    /// Builder stamping documents with the current time.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Assemble the document. Total over any input, including no lines.
    pub fn build(&self, lines: &[Line]) -> ReportDocument {
        let mut blocks = Vec::with_capacity(lines.len() + ReportDocument::LEAD_BLOCKS);
        blocks.extend(self.lead_blocks());

        for line in lines {
            if line.is_heading {
                blocks.push(Block::heading(heading_text(&line.content)));
            } else {
                blocks.push(Block::paragraph(tokenize(&line.content)));
            }
        }

        ReportDocument { blocks }
    }

    fn lead_blocks(&self) -> [Block; ReportDocument::LEAD_BLOCKS] {
        [
            Block::Heading {
                text: REPORT_TITLE.to_string(),
                level: HeadingLevel::Title,
            },
            Block::paragraph(vec![Span::plain(format!(
                "{}{}",
                GENERATED_ON_PREFIX,
                self.generated_at.format(TIMESTAMP_FORMAT)
            ))]),
        ]
    }
}

/// Strip the `###` marker and at most one following space from a heading line.
fn heading_text(content: &str) -> String {
    let trimmed = content.trim();
    let rest = trimmed.strip_prefix(HEADING_MARKER).unwrap_or(trimmed);
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}

/// Run the whole pipeline: split, tokenize and build.
pub fn format_report(text: &str, generated_at: DateTime<Utc>) -> ReportDocument {
    DocumentBuilder::new(generated_at).build(&split_lines(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_build_withNoLines_shouldReturnLeadBlocksOnly() {
        let doc = DocumentBuilder::new(fixed_time()).build(&[]);
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(
            doc.blocks[0],
            Block::Heading {
                text: "Supplier Report".to_string(),
                level: HeadingLevel::Title
            }
        );
        assert_eq!(
            doc.blocks[1],
            Block::paragraph(vec![Span::plain("Generated on: 2024-03-15 09:30 UTC")])
        );
    }

    #[test]
    fn test_build_withHeadingLine_shouldStripMarker() {
        let doc = format_report("### Event Overview", fixed_time());
        assert_eq!(doc.blocks[2], Block::heading("Event Overview"));
    }

    #[test]
    fn test_build_withExtraHashes_shouldKeepThemInText() {
        let doc = format_report("#### Deep", fixed_time());
        assert_eq!(doc.blocks[2], Block::heading("# Deep"));
    }

    #[test]
    fn test_build_withIndentedHeading_shouldTrimBeforeStripping() {
        let doc = format_report("   ###Budget  ", fixed_time());
        assert_eq!(doc.blocks[2], Block::heading("Budget"));
    }

    #[test]
    fn test_build_withBoldInHeading_shouldNotTokenize() {
        let doc = format_report("### **Suppliers**", fixed_time());
        assert_eq!(doc.blocks[2], Block::heading("**Suppliers**"));
    }

    #[test]
    fn test_build_withBlankLine_shouldEmitEmptyParagraph() {
        let doc = format_report("a\n\nb", fixed_time());
        assert_eq!(doc.blocks.len(), 5);
        assert_eq!(doc.blocks[3], Block::paragraph(vec![Span::plain("")]));
    }

    #[test]
    fn test_formatReport_endToEnd_shouldMatchExpectedTree() {
        let text = "### Event Overview\nThe event \"**Gala**\" is scheduled for **2024-04-01**.";
        let doc = format_report(text, fixed_time());

        assert_eq!(doc.blocks.len(), 4);
        assert_eq!(doc.blocks[2], Block::heading("Event Overview"));
        assert_eq!(
            doc.blocks[3],
            Block::paragraph(vec![
                Span::plain("The event \""),
                Span::emphasized("Gala"),
                Span::plain("\" is scheduled for "),
                Span::emphasized("2024-04-01"),
                Span::plain("."),
            ])
        );
    }
}
