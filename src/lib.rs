/*!
 * # EventDesk - event and supplier management with AI reports
 *
 * A Rust library for running events together with the suppliers that
 * deliver them, and for turning the state of an event into a Word report.
 *
 * ## Features
 *
 * - Events, suppliers, assignments and deliverables stored in SQLite
 * - Milestone tracking with derived progress
 * - Supplier portal: uploads, comments and progress reports
 * - Report text written by an AI provider:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 * - Offline report text composed from stored data
 * - DOCX rendering of `###` headings and `**bold**` spans
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite persistence and the repository
 * - `report`: Report text, formatting and DOCX rendering:
 *   - `report::splitter`: Line classification
 *   - `report::inline`: Emphasis spans
 *   - `report::builder`: Document tree assembly
 *   - `report::docx`: WordprocessingML output
 *   - `report::service`: Report generation
 * - `portal`: Supplier-side operations
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod portal;
pub mod providers;
pub mod report;

// Re-export main types
pub use app_config::Config;
pub use app_controller::Controller;
pub use database::Repository;
pub use portal::SupplierPortal;
pub use report::{ReportMode, ReportService, format_report};
