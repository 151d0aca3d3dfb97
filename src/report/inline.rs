/*!
 * Inline style tokenizer for body lines.
 *
 * Every non-overlapping `**` toggles emphasis, scanning left to right. The
 * 1st, 3rd, 5th... occurrence opens emphasis and the 2nd, 4th... closes it.
 *
 * A trailing unmatched opener emphasizes everything up to the end of the
 * line (open-ended emphasis).
 *
 * Empty plain segments are skipped, so `**bold**` yields a single span.
 * Empty emphasized segments (`a****b`) are kept as zero-length spans, and
 * adjacent spans are never merged.
 */

use super::model::Span;

/// Paired delimiter marking emphasized text
pub const EMPHASIS_DELIMITER: &str = "**";

/// Split a body line into plain and emphasized spans.
///
/// Always returns at least one span; an input that yields nothing
/// (for instance the empty string) produces a single plain empty span.
pub fn tokenize(line: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = line
        .split(EMPHASIS_DELIMITER)
        .enumerate()
        .filter_map(|(index, segment)| {
            let emphasized = index % 2 == 1;
            if !emphasized && segment.is_empty() {
                return None;
            }
            Some(Span {
                text: segment.to_string(),
                emphasized,
            })
        })
        .collect();

    if spans.is_empty() {
        spans.push(Span::plain(""));
    }

    spans
}

/// Whether a line leaves an emphasis opener unmatched.
pub fn has_unmatched_delimiter(line: &str) -> bool {
    line.matches(EMPHASIS_DELIMITER).count() % 2 == 1
}
