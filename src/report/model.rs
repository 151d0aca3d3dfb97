/*!
 * Document tree produced by the report formatter.
 *
 * The tree is renderer-agnostic: a flat, ordered list of heading and
 * paragraph blocks, where paragraphs hold styled text runs.
 */

use serde::{Deserialize, Serialize};

/// Fixed text of the lead title block
pub const REPORT_TITLE: &str = "Supplier Report";

/// Prefix of the lead timestamp paragraph
pub const GENERATED_ON_PREFIX: &str = "Generated on: ";

/// One newline-delimited line of raw report text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Line content exactly as it appeared in the input
    pub content: String,
    /// True iff the trimmed content starts with `###`
    pub is_heading: bool,
}

/// A run of text that is either entirely emphasized or entirely plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Text with delimiter markers stripped
    pub text: String,
    /// Rendered in bold weight when true
    pub emphasized: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }
}

/// Heading weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingLevel {
    /// The fixed document title
    Title,
    /// A section heading taken from a `###` line
    Section,
}

/// A block of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// A heading holding a single string
    Heading { text: String, level: HeadingLevel },
    /// A paragraph holding ordered runs
    Paragraph { spans: Vec<Span> },
}

impl Block {
    /// Section heading block
    pub fn heading(text: impl Into<String>) -> Self {
        Block::Heading {
            text: text.into(),
            level: HeadingLevel::Section,
        }
    }

    pub fn paragraph(spans: Vec<Span>) -> Self {
        Block::Paragraph { spans }
    }

    /// Heading text, if this is a heading.
    pub fn heading_text(&self) -> Option<&str> {
        match self {
            Block::Heading { text, .. } => Some(text),
            Block::Paragraph { .. } => None,
        }
    }

    /// Paragraph runs, if this is a paragraph.
    pub fn spans(&self) -> Option<&[Span]> {
        match self {
            Block::Paragraph { spans } => Some(spans),
            Block::Heading { .. } => None,
        }
    }

    /// Concatenated visible text of the block.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { text, .. } => text.clone(),
            Block::Paragraph { spans } => spans.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// Complete report document: lead blocks followed by content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Number of lead blocks every document starts with.
    pub const LEAD_BLOCKS: usize = 2;

    /// Blocks derived from the report text, without the lead blocks.
    pub fn content_blocks(&self) -> &[Block] {
        self.blocks.get(Self::LEAD_BLOCKS..).unwrap_or(&[])
    }

    /// Section headings in document order.
    pub fn section_headings(&self) -> Vec<&str> {
        self.content_blocks()
            .iter()
            .filter_map(|b| b.heading_text())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
