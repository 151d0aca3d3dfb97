/*!
 * Tests for the report formatter: splitting, inline styles and tree building
 */

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use eventdesk::report::builder::DocumentBuilder;
use eventdesk::report::inline::{has_unmatched_delimiter, tokenize};
use eventdesk::report::splitter::split_lines;
use eventdesk::report::{Block, HeadingLevel, ReportDocument, Span, format_report};

use crate::common::SAMPLE_REPORT;

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
}

/// Text built from the characters that matter to the formatter
fn report_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-c #*\n]{0,40}").unwrap()
}

fn line_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-c *]{0,30}").unwrap()
}

#[test]
fn test_formatReport_withSampleReport_shouldProduceFourBlocks() {
    let document = format_report(SAMPLE_REPORT, fixed_time());

    assert_eq!(document.len(), 4);
    assert_eq!(
        document.blocks[0],
        Block::Heading {
            text: "Supplier Report".to_string(),
            level: HeadingLevel::Title,
        }
    );
    assert_eq!(document.blocks[1].plain_text(), "Generated on: 2026-03-14 09:30 UTC");
    assert_eq!(document.blocks[2], Block::heading("Event Overview"));
    assert_eq!(
        document.blocks[3],
        Block::paragraph(vec![
            Span::plain("The event \""),
            Span::emphasized("Gala"),
            Span::plain("\" is scheduled for "),
            Span::emphasized("2024-04-01"),
            Span::plain("."),
        ])
    );
}

#[test]
fn test_tokenize_withListedInputs_shouldMatchExpectedSpans() {
    assert_eq!(tokenize(""), vec![Span::plain("")]);
    assert_eq!(tokenize("plain text"), vec![Span::plain("plain text")]);
    assert_eq!(tokenize("**bold**"), vec![Span::emphasized("bold")]);
    assert_eq!(
        tokenize("a **b** c"),
        vec![Span::plain("a "), Span::emphasized("b"), Span::plain(" c")]
    );
}

#[test]
fn test_build_withNoLines_shouldOnlyHaveLeadBlocks() {
    let document = DocumentBuilder::new(fixed_time()).build(&[]);
    assert_eq!(document.len(), ReportDocument::LEAD_BLOCKS);
    assert!(document.content_blocks().is_empty());
}

#[test]
fn test_formatReport_withDeepHeading_shouldKeepExtraHashes() {
    let document = format_report("#### Deep", fixed_time());
    assert_eq!(document.section_headings(), vec!["# Deep"]);
}

// Odd delimiter counts leave the tail of the line emphasized
#[test]
fn test_tokenize_withUnmatchedOpener_shouldEmphasizeToEndOfLine() {
    assert!(has_unmatched_delimiter("Total **1,200"));
    assert_eq!(
        tokenize("Total **1,200"),
        vec![Span::plain("Total "), Span::emphasized("1,200")]
    );
}

proptest! {
    #[test]
    fn prop_splitLines_joined_shouldReconstructInput(text in report_text()) {
        let joined = split_lines(&text)
            .iter()
            .map(|line| line.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        prop_assert_eq!(joined, text);
    }

    #[test]
    fn prop_tokenize_withBalancedDelimiters_shouldOnlyDropMarkers(line in line_text()) {
        prop_assume!(!has_unmatched_delimiter(&line));
        let text: String = tokenize(&line).iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(text, line.replace("**", ""));
    }

    #[test]
    fn prop_tokenize_withUnmatchedDelimiter_shouldEndEmphasized(line in line_text()) {
        prop_assume!(has_unmatched_delimiter(&line));
        let spans = tokenize(&line);
        prop_assert!(spans.last().is_some_and(|s| s.emphasized));
    }

    #[test]
    fn prop_tokenize_shouldNeverReturnEmptyPlainSpansAlongsideOthers(line in line_text()) {
        let spans = tokenize(&line);
        prop_assert!(!spans.is_empty());
        if spans.len() > 1 {
            prop_assert!(spans.iter().all(|s| s.emphasized || !s.text.is_empty()));
        }
    }

    #[test]
    fn prop_formatReport_shouldMirrorLinesInOrder(text in report_text()) {
        let lines = split_lines(&text);
        let document = format_report(&text, fixed_time());

        prop_assert_eq!(document.len(), lines.len() + ReportDocument::LEAD_BLOCKS);
        for (line, block) in lines.iter().zip(document.content_blocks()) {
            prop_assert_eq!(line.is_heading, block.heading_text().is_some());
        }

        let heading_count = lines.iter().filter(|l| l.is_heading).count();
        prop_assert_eq!(document.section_headings().len(), heading_count);
    }
}
