/*!
 * Event report generation.
 *
 * Report text uses two markers: a line starting with `###` is a section
 * heading, and text between `**` pairs is emphasized. The pipeline is:
 *
 * - `splitter`: text into classified lines
 * - `inline`: body lines into plain and emphasized spans
 * - `builder`: lines into a document tree with the fixed title and timestamp
 * - `docx`: document tree into a WordprocessingML package
 *
 * `prompts`, `compose` and `overview` produce the text; `service` ties the
 * repository, the provider and the pipeline together.
 */

pub mod builder;
pub mod compose;
pub mod docx;
pub mod inline;
pub mod model;
pub mod overview;
pub mod prompts;
pub mod service;
pub mod splitter;

pub use builder::{DocumentBuilder, format_report};
pub use docx::DocxRenderer;
pub use model::{Block, HeadingLevel, Line, ReportDocument, Span};
pub use service::{GeneratedReport, ReportMode, ReportService};
