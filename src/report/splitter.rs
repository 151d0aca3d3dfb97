/*!
 * Section splitting: raw report text into classified lines.
 */

use super::model::Line;

/// Literal prefix that marks a heading line
pub const HEADING_MARKER: &str = "###";

/// Split raw report text on `'\n'`, keeping empty lines, and classify each line.
///
/// Joining the returned contents with `'\n'` reproduces the input exactly.
pub fn split_lines(text: &str) -> Vec<Line> {
    text.split('\n')
        .map(|content| Line {
            is_heading: is_heading(content),
            content: content.to_string(),
        })
        .collect()
}

/// Heading iff the trimmed line starts with `###`.
pub fn is_heading(content: &str) -> bool {
    content.trim().starts_with(HEADING_MARKER)
}
