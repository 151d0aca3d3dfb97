/*!
 * End-to-end report generation: repository, provider, formatter and file output
 */

use std::sync::Arc;

use eventdesk::app_config::{Config, GenerationCommonConfig, ReportStyle};
use eventdesk::errors::{ProviderError, RecordError, ReportError};
use eventdesk::providers::mock::{CANNED_REPORT, MockProvider};
use eventdesk::{Controller, ReportMode, ReportService, Repository};

use crate::common::{create_event, create_supplier, create_temp_dir, deliverable, init_logging};

async fn seeded_repository() -> (Repository, i64) {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Harbour Festival", 12_000.0).await;
    let stage = create_supplier(&repository, "stageworks").await;
    let sound = create_supplier(&repository, "soundco").await;

    repository
        .assign_supplier(
            event.id,
            stage.id,
            5_000.0,
            vec![deliverable("Main stage", 1, 4_200.0), deliverable("Barriers", 20, 25.0)],
        )
        .await
        .unwrap();
    repository
        .assign_supplier(event.id, sound.id, 3_500.0, vec![deliverable("PA system", 2, 1_200.0)])
        .await
        .unwrap();

    (repository, event.id)
}

#[tokio::test]
async fn test_generateEventReport_ai_shouldFormatProviderText() {
    init_logging();
    let (repository, event_id) = seeded_repository().await;
    let mock = MockProvider::working();
    let service = ReportService::new(repository, ReportStyle::default())
        .with_provider(Arc::new(mock.clone()), GenerationCommonConfig::default());

    let report = service.generate_event_report(event_id, ReportMode::Ai).await.unwrap();

    assert_eq!(report.text, CANNED_REPORT);
    assert_eq!(report.file_name, "event-report.docx");
    assert_eq!(report.document.section_headings(), vec!["Event Overview", "Budget", "Risks"]);
    assert!(report.bytes.starts_with(b"PK"));
    assert!(report.usage.is_some());

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt.contains("Harbour Festival"));
    assert!(requests[0].prompt.contains("PA system"));
}

#[tokio::test]
async fn test_generateEventReport_offline_shouldNotCallProvider() {
    let (repository, event_id) = seeded_repository().await;
    let mock = MockProvider::working();
    let service = ReportService::new(repository, ReportStyle::default())
        .with_provider(Arc::new(mock.clone()), GenerationCommonConfig::default());

    let report = service
        .generate_event_report(event_id, ReportMode::Offline)
        .await
        .unwrap();

    assert_eq!(mock.request_count(), 0);
    assert!(report.usage.is_none());
    let headings = report.document.section_headings();
    assert_eq!(headings[0], "Event: Harbour Festival");
    assert!(headings.contains(&"Suppliers"));
    assert!(report.text.contains("$8,500.00"));
}

#[tokio::test]
async fn test_generateEventReport_providerFailure_shouldPropagateWithoutFallback() {
    let (repository, event_id) = seeded_repository().await;
    let service = ReportService::new(repository, ReportStyle::default())
        .with_provider(Arc::new(MockProvider::unauthorized()), GenerationCommonConfig::default());

    let err = service
        .generate_event_report(event_id, ReportMode::Ai)
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        ReportError::Provider(ProviderError::AuthenticationError(_))
    ));
}

#[tokio::test]
async fn test_generateEventReport_emptyProviderText_shouldBeEmptyResponse() {
    let (repository, event_id) = seeded_repository().await;
    let service = ReportService::new(repository, ReportStyle::default())
        .with_provider(Arc::new(MockProvider::empty()), GenerationCommonConfig::default());

    let err = service
        .generate_event_report(event_id, ReportMode::Ai)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ReportError::Provider(ProviderError::EmptyResponse)));
}

#[tokio::test]
async fn test_generateEventReport_unknownEvent_shouldBeNotFound() {
    let (repository, _) = seeded_repository().await;
    let service = ReportService::new(repository, ReportStyle::default());

    let err = service
        .generate_event_report(404, ReportMode::Offline)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ReportError::Record(RecordError::NotFound { entity: "event", .. })
    ));
}

#[tokio::test]
async fn test_controller_eventReport_shouldRespectForceFlag() {
    let (repository, event_id) = seeded_repository().await;
    let mock = MockProvider::working();
    let controller = Controller::with_repository(Config::default(), repository).with_provider(Arc::new(mock.clone()));
    let out = create_temp_dir().unwrap();
    let out_dir = Some(out.path().to_path_buf());

    let first = controller
        .run_event_report(event_id, ReportMode::Ai, out_dir.clone(), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.file_name().unwrap(), "harbour-festival-event-report.docx");

    let skipped = controller
        .run_event_report(event_id, ReportMode::Ai, out_dir.clone(), false)
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(mock.request_count(), 1);

    let forced = controller
        .run_event_report(event_id, ReportMode::Ai, out_dir, true)
        .await
        .unwrap();
    assert_eq!(forced, Some(first));
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_controller_overviewReport_shouldListEveryEvent() {
    let (repository, _) = seeded_repository().await;
    create_event(&repository, "Winter Market", 4_000.0).await;
    let controller = Controller::with_repository(Config::default(), repository.clone());
    let out = create_temp_dir().unwrap();

    let path = controller
        .run_overview_report(Some(out.path().to_path_buf()), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "events-overview.docx");

    let report = ReportService::new(repository, ReportStyle::default())
        .generate_overview_report()
        .await
        .unwrap();
    let headings = report.document.section_headings();
    assert_eq!(headings[0], "Overall Statistics");
    assert!(headings.contains(&"Harbour Festival"));
    assert!(headings.contains(&"Winter Market"));
}
