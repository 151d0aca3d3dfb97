/*!
 * Report generation service.
 *
 * Loads an event from the repository, obtains report text either from the
 * configured provider or from the stored data, formats it into a document
 * tree and packages it as a `.docx`.
 */

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::builder::DocumentBuilder;
use super::compose::compose_report_text;
use super::docx::{DocxRenderer, EVENT_REPORT_FILENAME, SUPPLIER_REPORT_FILENAME};
use super::model::ReportDocument;
use super::overview::render_overview_text;
use super::prompts::ReportPromptBuilder;
use super::splitter::split_lines;
use crate::app_config::{GenerationCommonConfig, ReportStyle};
use crate::database::Repository;
use crate::database::models::Overview;
use crate::errors::{ProviderError, ReportError};
use crate::providers::Provider;

/// File name of the all-events report
pub const OVERVIEW_REPORT_FILENAME: &str = "events-overview.docx";

/// Where the report text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Written by the configured language model
    #[default]
    Ai,
    /// Composed from stored data only
    Offline,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Ai => write!(f, "ai"),
            ReportMode::Offline => write!(f, "offline"),
        }
    }
}

/// Token accounting of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct TokenUsage {
    pub provider: String,
    pub model: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    /// Time spent waiting on the provider
    pub api_duration: Duration,
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = |count: Option<u64>| count.map_or_else(|| "?".to_string(), |c| c.to_string());
        write!(
            f,
            "{} ({}): {} prompt + {} completion tokens in {:.1}s",
            self.provider,
            self.model,
            tokens(self.prompt_tokens),
            tokens(self.completion_tokens),
            self.api_duration.as_secs_f64()
        )
    }
}

/// A finished report
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Raw report text before formatting
    pub text: String,
    pub document: ReportDocument,
    /// Packaged `.docx` bytes
    pub bytes: Vec<u8>,
    /// Suggested file name for the package
    pub file_name: String,
    pub generated_at: DateTime<Utc>,
    /// Present when a provider wrote the text
    pub usage: Option<TokenUsage>,
}

/// Report generation service
#[derive(Clone)]
pub struct ReportService {
    repository: Repository,
    provider: Option<Arc<dyn Provider>>,
    common: GenerationCommonConfig,
    renderer: DocxRenderer,
}

impl ReportService {
    /// Service without a provider; only offline reports can be generated
    pub fn new(repository: Repository, style: ReportStyle) -> Self {
        Self {
            repository,
            provider: None,
            common: GenerationCommonConfig::default(),
            renderer: DocxRenderer::new(style),
        }
    }

    /// Attach the provider used for AI reports
    pub fn with_provider(mut self, provider: Arc<dyn Provider>, common: GenerationCommonConfig) -> Self {
        self.provider = Some(provider);
        self.common = common;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Generate the report of one event.
    ///
    /// Provider failures are returned as is; an AI report never falls back to
    /// the offline text.
    pub async fn generate_event_report(
        &self,
        event_id: i64,
        mode: ReportMode,
    ) -> Result<GeneratedReport, ReportError> {
        let details = self.repository.get_event_details(event_id).await?;
        info!(
            "Generating {} report for event {} ({} suppliers)",
            mode,
            details.event.name,
            details.suppliers.len()
        );

        let (text, usage) = match mode {
            ReportMode::Offline => (compose_report_text(&details), None),
            ReportMode::Ai => {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    ProviderError::RequestFailed("No provider configured for AI reports".to_string())
                })?;
                let request = ReportPromptBuilder::new(&details).build(&self.common);
                debug!("Report prompt is {} chars", request.prompt.len());

                let started = Instant::now();
                let completion = provider.complete(request).await?;
                if completion.text.trim().is_empty() {
                    warn!("{} returned an empty report", provider.name());
                    return Err(ProviderError::EmptyResponse.into());
                }

                let usage = TokenUsage {
                    provider: provider.name().to_string(),
                    model: completion.model,
                    prompt_tokens: completion.prompt_tokens,
                    completion_tokens: completion.completion_tokens,
                    api_duration: started.elapsed(),
                };
                (completion.text, Some(usage))
            }
        };

        let mut report = self.package(text, EVENT_REPORT_FILENAME)?;
        report.usage = usage;
        Ok(report)
    }

    /// Generate the all-events overview report
    pub async fn generate_overview_report(&self) -> Result<GeneratedReport, ReportError> {
        let events = self.repository.list_event_details().await?;
        let overview = Overview::from_details(&events);
        info!("Generating overview report for {} events", overview.total_events);
        self.package(render_overview_text(&overview, &events), OVERVIEW_REPORT_FILENAME)
    }

    /// Format arbitrary report text into a document
    pub fn format_text(&self, text: &str) -> Result<GeneratedReport, ReportError> {
        self.package(text.to_string(), SUPPLIER_REPORT_FILENAME)
    }

    fn package(&self, text: String, file_name: &str) -> Result<GeneratedReport, ReportError> {
        let generated_at = Utc::now();
        let document = DocumentBuilder::new(generated_at).build(&split_lines(&text));
        let bytes = self.renderer.render(&document)?;
        debug!("Rendered {} blocks into {} bytes", document.len(), bytes.len());

        Ok(GeneratedReport {
            text,
            document,
            bytes,
            file_name: file_name.to_string(),
            generated_at,
            usage: None,
        })
    }
}
