/*!
 * Tests for application configuration functionality
 */

use eventdesk::app_config::{Config, GenerationProvider, LogLevel, ReportStyle};
use eventdesk::providers::build_provider;

use crate::common::create_temp_dir;

#[test]
fn test_defaultConfig_shouldUseOllamaAndCalibri() {
    let config = Config::default();

    assert_eq!(config.generation.provider, GenerationProvider::Ollama);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.report.output_dir, "reports");
    assert_eq!(
        config.report.style,
        ReportStyle {
            font_family: "Calibri".to_string(),
            body_size_pt: 11,
            title_size_pt: 16,
            heading_size_pt: 13,
            spacing_after_twips: 200,
        }
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_missingFile_shouldWriteDefaultsOnce() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let (_, created) = Config::load_or_create(&path).unwrap();
    assert!(created);
    assert!(path.exists());

    let (config, created) = Config::load_or_create(&path).unwrap();
    assert!(!created);
    assert_eq!(config.generation.get_model(), "llama3.2:3b");
}

#[test]
fn test_loadOrCreate_partialFile_shouldFillDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "database_path": "/tmp/events.db", "generation": { "provider": "lmstudio" }, "log_level": "debug" }"#,
    )
    .unwrap();

    let (config, _) = Config::load_or_create(&path).unwrap();

    assert_eq!(config.database_path.as_deref(), Some("/tmp/events.db"));
    assert_eq!(config.generation.provider, GenerationProvider::LMStudio);
    assert_eq!(config.generation.get_endpoint(), "http://localhost:1234/v1");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.report.style.font_family, "Calibri");
}

#[test]
fn test_validate_withInvalidValues_shouldReject() {
    let mut config = Config::default();
    config.generation.provider = GenerationProvider::OpenAI;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.generation.common.temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.generation.common.max_tokens = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.report.style.heading_size_pt = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_setModel_shouldOnlyChangeActiveProvider() {
    let mut config = Config::default();
    config.generation.provider = GenerationProvider::Anthropic;
    config.generation.set_model("claude-sonnet-4-0");

    assert_eq!(config.generation.get_model(), "claude-sonnet-4-0");
    config.generation.provider = GenerationProvider::OpenAI;
    assert_eq!(config.generation.get_model(), "gpt-4o-mini");
}

#[test]
fn test_resolveStorageDir_withoutSetting_shouldSitNextToDatabase() {
    let config = Config {
        database_path: Some("/var/lib/eventdesk/events.db".to_string()),
        ..Config::default()
    };
    assert_eq!(
        config.resolve_storage_dir().unwrap(),
        std::path::PathBuf::from("/var/lib/eventdesk/documents")
    );
}

#[test]
fn test_buildProvider_shouldFollowConfiguredType() {
    let mut config = Config::default();
    assert_eq!(build_provider(&config.generation).unwrap().name(), "Ollama");

    config.generation.provider = GenerationProvider::LMStudio;
    assert_eq!(build_provider(&config.generation).unwrap().name(), "LM Studio");
}
