/*!
 * Supplier portal workflow through the controller
 */

use eventdesk::app_config::Config;
use eventdesk::database::models::{AttachmentKind, DeliverableStatus, SupplierStatus};
use eventdesk::errors::RecordError;
use eventdesk::file_utils::FileManager;
use eventdesk::{Controller, Repository};

use crate::common::{create_event, create_supplier, create_temp_dir, create_test_file, deliverable};

async fn controller_with_assignment(storage_dir: &std::path::Path) -> (Controller, i64, i64) {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Riverside Concert", 7_500.0).await;
    let rigging = create_supplier(&repository, "rigging").await;
    let catering = create_supplier(&repository, "catering").await;

    let (_, own) = repository
        .assign_supplier(event.id, rigging.id, 3_000.0, vec![deliverable("Truss", 8, 150.0)])
        .await
        .unwrap();
    let (_, other) = repository
        .assign_supplier(event.id, catering.id, 1_500.0, vec![deliverable("Buffet", 1, 1_400.0)])
        .await
        .unwrap();

    let config = Config {
        storage_dir: Some(storage_dir.to_string_lossy().to_string()),
        ..Config::default()
    };
    (Controller::with_repository(config, repository), own[0].id, other[0].id)
}

#[tokio::test]
async fn test_portal_uploadThenProgress_shouldBeVisibleToAgency() {
    let store = create_temp_dir().unwrap();
    let inbox = create_temp_dir().unwrap();
    let (controller, own, _) = controller_with_assignment(store.path()).await;
    let photo = create_test_file(inbox.path(), "truss.JPG", b"\xFF\xD8\xFF\xE0 jpeg").unwrap();

    let portal = controller.open_portal("rigging").await.unwrap();
    let attachment = portal
        .upload_document(own, AttachmentKind::Installation, &photo, "Truss flown and checked")
        .await
        .unwrap();
    portal.report_progress(own, 60, None, None).await.unwrap();

    let (sha256, size) = FileManager::hash_file(&photo).unwrap();
    assert_eq!(attachment.sha256, sha256);
    assert_eq!(attachment.size_bytes, size);
    assert!(attachment.stored_path.ends_with(".jpg"));

    let repository = controller.repository();
    let stored = repository.get_deliverable(own).await.unwrap().unwrap();
    assert_eq!(stored.current_status, DeliverableStatus::InProgress);
    assert_eq!(stored.progress_percentage, 60);

    let comments = repository.list_comments(own).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains("Truss flown and checked"));
}

#[tokio::test]
async fn test_portal_otherSuppliersDeliverable_shouldBeRejected() {
    let store = create_temp_dir().unwrap();
    let inbox = create_temp_dir().unwrap();
    let (controller, _, other) = controller_with_assignment(store.path()).await;
    let file = create_test_file(inbox.path(), "menu.pdf", b"%PDF").unwrap();

    let portal = controller.open_portal("rigging").await.unwrap();
    let err = portal
        .upload_document(other, AttachmentKind::Document, &file, "Menu")
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::NotAssigned { deliverable, .. }) if *deliverable == other
    ));
    assert_eq!(std::fs::read_dir(store.path()).map(|d| d.count()).unwrap_or(0), 0);
    assert!(controller.repository().list_attachments(other).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_portal_inactiveSupplier_shouldNotOpen() {
    let store = create_temp_dir().unwrap();
    let (controller, _, _) = controller_with_assignment(store.path()).await;
    let supplier = controller
        .repository()
        .find_supplier_by_username("catering")
        .await
        .unwrap()
        .unwrap();
    controller
        .repository()
        .update_supplier_status(supplier.id, SupplierStatus::Inactive)
        .await
        .unwrap();

    let err = controller.open_portal("catering").await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::Invalid { field: "supplier", .. })
    ));
}
