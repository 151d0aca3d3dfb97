use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::database::{DatabaseConnection, Repository};
use crate::file_utils::FileManager;
use crate::portal::SupplierPortal;
use crate::providers::{Provider, build_provider};
use crate::report::docx::EVENT_REPORT_FILENAME;
use crate::report::{GeneratedReport, ReportMode, ReportService};

// @module: Application controller for report generation

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    repository: Repository,
    /// Provider override; built from the configuration when absent
    provider: Option<Arc<dyn Provider>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = config.resolve_database_path()?;
        let db = DatabaseConnection::new(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        Ok(Self::with_repository(config, Repository::new(db)))
    }

    /// Controller over an existing repository
    pub fn with_repository(config: Config, repository: Repository) -> Self {
        Self {
            config,
            repository,
            provider: None,
        }
    }

    /// Use the given provider instead of the configured one
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    fn output_dir(&self, output_dir: Option<PathBuf>) -> PathBuf {
        output_dir.unwrap_or_else(|| PathBuf::from(&self.config.report.output_dir))
    }

    fn report_service(&self, mode: ReportMode) -> Result<ReportService> {
        let service = ReportService::new(self.repository.clone(), self.config.report.style.clone());
        if mode == ReportMode::Offline {
            return Ok(service);
        }

        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => Arc::from(build_provider(&self.config.generation)?),
        };
        Ok(service.with_provider(provider, self.config.generation.common.clone()))
    }

    /// Generate one event report into `output_dir`.
    ///
    /// Returns `None` when the output already exists and `force_overwrite` is off.
    pub async fn run_event_report(
        &self,
        event_id: i64,
        mode: ReportMode,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();
        let event = self
            .repository
            .get_event(event_id)
            .await?
            .ok_or_else(|| crate::errors::RecordError::not_found("event", event_id))?;

        // Check before generating so no provider call is wasted
        let output_path = self
            .output_dir(output_dir)
            .join(FileManager::report_file_name(&event.name, EVENT_REPORT_FILENAME));
        if output_path.exists() && !force_overwrite {
            warn!("Skipping report, {:?} already exists (use --force to overwrite)", output_path);
            return Ok(None);
        }

        let service = self.report_service(mode)?;
        let spinner = (mode == ReportMode::Ai).then(|| Self::spinner(&format!("Writing report for {}", event.name)));
        let result = service.generate_event_report(event_id, mode).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let report = result?;

        if let Some(usage) = &report.usage {
            info!("{}", usage);
        }
        self.save_report(&report, &output_path, force_overwrite)?;
        info!("Report generated in {}", Self::format_duration(start_time.elapsed()));
        Ok(Some(output_path))
    }

    /// Generate the all-events overview report
    pub async fn run_overview_report(&self, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let service = self.report_service(ReportMode::Offline)?;
        let report = service.generate_overview_report().await?;

        let output_path = self.output_dir(output_dir).join(&report.file_name);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping report, {:?} already exists (use --force to overwrite)", output_path);
            return Ok(None);
        }
        self.save_report(&report, &output_path, force_overwrite)?;
        Ok(Some(output_path))
    }

    /// Format an existing report text file into `<stem>.docx`
    pub fn format_text_file(
        &self,
        input_file: &Path,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let text = FileManager::read_to_string(input_file)?;
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());

        let output_dir = match output_dir {
            Some(dir) => dir,
            None => input_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let output_path = output_dir.join(format!("{}.docx", stem));
        if output_path.exists() && !force_overwrite {
            warn!("Skipping report, {:?} already exists (use --force to overwrite)", output_path);
            return Ok(None);
        }

        let report = self.report_service(ReportMode::Offline)?.format_text(&text)?;
        self.save_report(&report, &output_path, force_overwrite)?;
        Ok(Some(output_path))
    }

    /// Open the supplier portal for `username`
    pub async fn open_portal(&self, username: &str) -> Result<SupplierPortal> {
        let storage_dir = self.config.resolve_storage_dir()?;
        SupplierPortal::open(self.repository.clone(), username, storage_dir).await
    }

    /// Check that the configured provider answers
    pub async fn test_provider(&self) -> Result<()> {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => Arc::from(build_provider(&self.config.generation)?),
        };
        let spinner = Self::spinner(&format!("Contacting {}", provider.name()));
        let result = provider.test_connection().await;
        spinner.finish_and_clear();
        result?;
        info!("{} is reachable", provider.name());
        Ok(())
    }

    fn save_report(&self, report: &GeneratedReport, output_path: &Path, force_overwrite: bool) -> Result<()> {
        FileManager::write_bytes(output_path, &report.bytes, force_overwrite)?;
        info!("Success: {}", output_path.display());
        Ok(())
    }

    fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
