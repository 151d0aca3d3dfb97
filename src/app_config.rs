use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// SQLite database file; the platform data directory is used when unset
    #[serde(default)]
    pub database_path: Option<String>,

    /// Directory where uploaded supplier documents are copied
    #[serde(default)]
    pub storage_dir: Option<String>,

    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Text generation config
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Text generation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl GenerationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider refuses requests without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: GenerationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: match provider_type {
                GenerationProvider::Anthropic => default_anthropic_timeout_secs(),
                _ => default_timeout_secs(),
            },
            rate_limit: default_rate_limit(&provider_type),
        }
    }
}

/// Report generation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common generation settings
    #[serde(default)]
    pub common: GenerationCommonConfig,
}

/// Common generation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationCommonConfig {
    /// System prompt sent with every report request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for GenerationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Report output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportConfig {
    /// Directory reports are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Visual style handed to the document renderer
    #[serde(default)]
    pub style: ReportStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            style: ReportStyle::default(),
        }
    }
}

/// Fonts and spacing of rendered reports
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Body text size in points
    #[serde(default = "default_body_size_pt")]
    pub body_size_pt: u32,

    /// Title size in points
    #[serde(default = "default_title_size_pt")]
    pub title_size_pt: u32,

    /// Section heading size in points
    #[serde(default = "default_heading_size_pt")]
    pub heading_size_pt: u32,

    /// Space after each paragraph in twentieths of a point
    #[serde(default = "default_spacing_after_twips")]
    pub spacing_after_twips: u32,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            body_size_pt: default_body_size_pt(),
            title_size_pt: default_title_size_pt(),
            heading_size_pt: default_heading_size_pt(),
            spacing_after_twips: default_spacing_after_twips(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_anthropic_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_output_dir() -> String {
    "reports".to_string()
}

fn default_font_family() -> String {
    "Calibri".to_string()
}

fn default_body_size_pt() -> u32 {
    11
}

fn default_title_size_pt() -> u32 {
    16
}

fn default_heading_size_pt() -> u32 {
    13
}

fn default_spacing_after_twips() -> u32 {
    200
}

fn default_endpoint(provider: &GenerationProvider) -> String {
    match provider {
        GenerationProvider::Ollama => "http://localhost:11434".to_string(),
        GenerationProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        GenerationProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        GenerationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &GenerationProvider) -> String {
    match provider {
        GenerationProvider::Ollama => "llama3.2:3b".to_string(),
        GenerationProvider::OpenAI => "gpt-4o-mini".to_string(),
        GenerationProvider::Anthropic => "claude-3-5-haiku-latest".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        GenerationProvider::LMStudio => "local-model".to_string(),
    }
}

fn default_rate_limit(provider: &GenerationProvider) -> Option<u32> {
    match provider {
        GenerationProvider::OpenAI => Some(60),
        GenerationProvider::Anthropic => Some(45),
        // Local servers are not rate limited
        GenerationProvider::Ollama | GenerationProvider::LMStudio => None,
    }
}

fn default_system_prompt() -> String {
    "You are an event operations analyst writing supplier status reports for an events agency. \
     Use only the data you are given. Start every section with a line of the form '### Section Title'. \
     Mark key figures, dates, supplier names and statuses with **double asterisks**. \
     Do not use tables, bullet symbols other than '-', or any other markdown."
        .to_string()
}

impl Config {
    /// Load the configuration from a JSON file, creating a default one when missing
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok((config, false))
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok((config, true))
        }
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let provider = &self.generation.provider;
        if provider.requires_api_key() && self.generation.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider",
                provider.display_name()
            ));
        }

        let common = &self.generation.common;
        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                common.temperature
            ));
        }
        if common.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }

        let style = &self.report.style;
        if style.body_size_pt == 0 || style.title_size_pt == 0 || style.heading_size_pt == 0 {
            return Err(anyhow!("Report font sizes must be greater than zero"));
        }
        if style.font_family.trim().is_empty() {
            return Err(anyhow!("Report font family cannot be empty"));
        }

        Ok(())
    }

    /// Resolve the database path, falling back to the platform data directory
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => crate::database::DatabaseConnection::default_database_path(),
        }
    }

    /// Resolve the upload storage directory, defaulting to a sibling of the database
    pub fn resolve_storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_dir {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => {
                let db_path = self.resolve_database_path()?;
                let base = db_path.parent().map(Path::to_path_buf).unwrap_or_default();
                Ok(base.join("documents"))
            }
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: None,
            storage_dir: None,
            report: ReportConfig::default(),
            generation: GenerationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl GenerationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &GenerationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Override the model of the active provider
    pub fn set_model(&mut self, model: &str) {
        let provider_str = self.provider.to_lowercase_string();
        match self
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            Some(provider_config) => provider_config.model = model.to_string(),
            None => {
                let mut provider_config = ProviderConfig::new(self.provider.clone());
                provider_config.model = model.to_string();
                self.available_providers.push(provider_config);
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.model.is_empty() => {
                provider_config.model.clone()
            }
            _ => default_model(&self.provider),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.endpoint.is_empty() => {
                provider_config.endpoint.clone()
            }
            _ => default_endpoint(&self.provider),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) if provider_config.timeout_secs > 0 => provider_config.timeout_secs,
            _ => default_timeout_secs(),
        }
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit,
            None => default_rate_limit(&self.provider),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(GenerationProvider::Ollama),
                ProviderConfig::new(GenerationProvider::OpenAI),
                ProviderConfig::new(GenerationProvider::Anthropic),
                ProviderConfig::new(GenerationProvider::LMStudio),
            ],
            common: GenerationCommonConfig::default(),
        }
    }
}
