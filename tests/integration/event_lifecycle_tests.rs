/*!
 * Event lifecycle: assignments, milestones, budgets and cascading deletes
 */

use eventdesk::Repository;
use eventdesk::database::models::{
    AssignmentStatus, AssignmentUpdate, DeliverableStatus, EventStatus, EventUpdate, MilestoneKind,
};
use eventdesk::errors::RecordError;

use crate::common::{create_event, create_supplier, date, deliverable};

#[tokio::test]
async fn test_milestones_shouldDriveProgressToCompletion() {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Spring Expo", 6_000.0).await;
    let supplier = create_supplier(&repository, "tentco").await;
    let (_, deliverables) = repository
        .assign_supplier(event.id, supplier.id, 2_000.0, vec![deliverable("Marquee", 1, 1_800.0)])
        .await
        .unwrap();
    let id = deliverables[0].id;
    assert_eq!(deliverables[0].current_status, DeliverableStatus::NotStarted);

    let delivered = repository
        .record_milestone(id, MilestoneKind::Delivery, date(2026, 6, 18))
        .await
        .unwrap();
    assert_eq!(delivered.progress_percentage, 33);
    assert_eq!(delivered.current_status, DeliverableStatus::InProgress);

    let installed = repository
        .record_milestone(id, MilestoneKind::Installation, date(2026, 6, 19))
        .await
        .unwrap();
    assert_eq!(installed.progress_percentage, 66);

    let dismantled = repository
        .record_milestone(id, MilestoneKind::Dismantling, date(2026, 6, 21))
        .await
        .unwrap();
    assert_eq!(dismantled.progress_percentage, 100);
    assert_eq!(dismantled.current_status, DeliverableStatus::Completed);
    assert_eq!(dismantled.actual_dismantling_date, Some(date(2026, 6, 21)));
}

#[tokio::test]
async fn test_overview_shouldAverageCompletionAcrossEvents() {
    let repository = Repository::new_in_memory().unwrap();
    let first = create_event(&repository, "First", 1_000.0).await;
    let second = create_event(&repository, "Second", 3_000.0).await;
    let supplier = create_supplier(&repository, "caterer").await;

    repository
        .assign_supplier(first.id, supplier.id, 500.0, Vec::new())
        .await
        .unwrap();
    repository
        .assign_supplier(second.id, supplier.id, 500.0, Vec::new())
        .await
        .unwrap();
    repository
        .update_assignment(
            first.id,
            supplier.id,
            AssignmentUpdate {
                status: Some(AssignmentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let overview = repository.overview().await.unwrap();
    assert_eq!(overview.total_events, 2);
    assert_eq!(overview.total_suppliers, 2);
    assert_eq!(overview.total_budget, 4_000.0);
    assert_eq!(overview.average_completion, 50);
}

#[tokio::test]
async fn test_eventDetails_overAllocated_shouldReportNegativeRemaining() {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Tight Budget", 1_000.0).await;
    let supplier = create_supplier(&repository, "lights").await;
    repository
        .assign_supplier(event.id, supplier.id, 1_250.0, Vec::new())
        .await
        .unwrap();

    let details = repository.get_event_details(event.id).await.unwrap();
    assert_eq!(details.remaining_budget(), -250.0);
    assert_eq!(details.completion_rate(), 0.0);
}

#[tokio::test]
async fn test_unassign_shouldRemoveOnlyThatSuppliersDeliverables() {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Conference", 9_000.0).await;
    let av = create_supplier(&repository, "av").await;
    let food = create_supplier(&repository, "food").await;
    repository
        .assign_supplier(event.id, av.id, 2_000.0, vec![deliverable("Projector", 2, 300.0)])
        .await
        .unwrap();
    repository
        .assign_supplier(event.id, food.id, 2_000.0, vec![deliverable("Lunch", 120, 12.5)])
        .await
        .unwrap();

    let removed = repository.remove_supplier_from_event(event.id, av.id).await.unwrap();
    assert_eq!(removed, 1);

    let remaining = repository.list_deliverables_for_event(event.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].item_name, "Lunch");
    assert_eq!(remaining[0].total_value, 1_500.0);
    assert!(repository.get_assignment(event.id, av.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleteEvent_shouldCascadeAndThenBeNotFound() {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Pop-up", 500.0).await;
    let supplier = create_supplier(&repository, "popup").await;
    let (_, deliverables) = repository
        .assign_supplier(event.id, supplier.id, 100.0, vec![deliverable("Kiosk", 1, 100.0)])
        .await
        .unwrap();
    repository
        .add_comment(deliverables[0].id, "agency", "Confirmed by phone")
        .await
        .unwrap();

    repository.delete_event(event.id).await.unwrap();

    assert!(repository.get_deliverable(deliverables[0].id).await.unwrap().is_none());
    let err = repository.delete_event(event.id).await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::NotFound { entity: "event", .. })
    ));
}

#[tokio::test]
async fn test_updateEvent_shouldChangeOnlyGivenFields() {
    let repository = Repository::new_in_memory().unwrap();
    let event = create_event(&repository, "Launch", 2_000.0).await;

    let updated = repository
        .update_event(
            event.id,
            EventUpdate {
                status: Some(EventStatus::Active),
                budget: Some(2_500.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Launch");
    assert_eq!(updated.status, EventStatus::Active);
    assert_eq!(updated.budget, 2_500.0);

    let active = repository.list_events(Some(EventStatus::Active)).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_createSupplier_duplicateUsername_shouldBeDuplicate() {
    let repository = Repository::new_in_memory().unwrap();
    create_supplier(&repository, "florist").await;

    let err = repository
        .create_supplier(&eventdesk::database::models::NewSupplier {
            name: "Other Florist".to_string(),
            email: "other@suppliers.example".to_string(),
            phone: String::new(),
            specialization: String::new(),
            username: "florist".to_string(),
            rating: 3,
        })
        .await
        .err()
        .unwrap();
    assert!(matches!(err.downcast_ref::<RecordError>(), Some(RecordError::Duplicate(_))));
}
