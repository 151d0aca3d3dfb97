/*!
 * Supplier portal.
 *
 * A supplier signs in by username and may only act on deliverables assigned
 * to them: list them, upload documents, comment and report progress.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::database::Repository;
use crate::database::models::{
    Attachment, AttachmentKind, Deliverable, DeliverableComment, DeliverableStatus,
    DeliverableUpdate, NewAttachment, Supplier, SupplierStatus,
};
use crate::errors::RecordError;
use crate::file_utils::FileManager;

/// Portal session of one supplier
#[derive(Clone)]
pub struct SupplierPortal {
    repository: Repository,
    supplier: Supplier,
    storage_dir: PathBuf,
}

impl SupplierPortal {
    /// Open the portal for an active supplier
    pub async fn open(repository: Repository, username: &str, storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let supplier = repository
            .find_supplier_by_username(username)
            .await?
            .ok_or_else(|| RecordError::not_found("supplier", username))?;

        if supplier.status == SupplierStatus::Inactive {
            return Err(RecordError::invalid("supplier", format!("account '{}' is inactive", username)).into());
        }

        Ok(Self {
            repository,
            supplier,
            storage_dir: storage_dir.into(),
        })
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    /// Deliverables assigned to this supplier across all events
    pub async fn assigned_deliverables(&self) -> Result<Vec<Deliverable>> {
        self.repository
            .list_deliverables_for_supplier(self.supplier.id)
            .await
    }

    /// Load a deliverable, failing unless it belongs to this supplier
    async fn own_deliverable(&self, deliverable_id: i64) -> Result<Deliverable> {
        let deliverable = self
            .repository
            .get_deliverable(deliverable_id)
            .await?
            .ok_or_else(|| RecordError::not_found("deliverable", deliverable_id))?;

        if deliverable.supplier_id != self.supplier.id {
            warn!(
                "Supplier {} tried to access deliverable {}",
                self.supplier.username, deliverable_id
            );
            return Err(RecordError::NotAssigned {
                supplier: self.supplier.username.clone(),
                deliverable: deliverable_id,
            }
            .into());
        }
        Ok(deliverable)
    }

    /// Copy a file into the document store and attach it to a deliverable.
    ///
    /// The upload is also noted as a comment on the deliverable.
    pub async fn upload_document(
        &self,
        deliverable_id: i64,
        kind: AttachmentKind,
        path: &Path,
        description: &str,
    ) -> Result<Attachment> {
        let description = description.trim();
        if description.is_empty() {
            return Err(RecordError::invalid("description", "must not be empty").into());
        }
        self.own_deliverable(deliverable_id).await?;

        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .with_context(|| format!("Not a file path: {:?}", path))?;

        let stored = FileManager::store_file(path, &self.storage_dir)?;
        let recorded = self
            .repository
            .add_attachment_with_comment(
                NewAttachment {
                    deliverable_id,
                    kind,
                    original_name: original_name.clone(),
                    stored_path: stored.path.to_string_lossy().to_string(),
                    sha256: stored.sha256,
                    size_bytes: stored.size_bytes,
                    description: description.to_string(),
                },
                &self.supplier.username,
                &format!("Uploaded {} ({}): {}", original_name, kind, description),
            )
            .await;

        let (attachment, _) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                // Do not leave an unreferenced copy behind
                if let Err(remove_error) = std::fs::remove_file(&stored.path) {
                    warn!("Failed to remove {:?}: {}", stored.path, remove_error);
                }
                return Err(e);
            }
        };

        info!(
            "{} uploaded {} for deliverable {}",
            self.supplier.username, original_name, deliverable_id
        );
        Ok(attachment)
    }

    /// Comment on a deliverable
    pub async fn comment(&self, deliverable_id: i64, body: &str) -> Result<DeliverableComment> {
        self.own_deliverable(deliverable_id).await?;
        self.repository
            .add_comment(deliverable_id, &self.supplier.username, body)
            .await
    }

    /// Report progress on a deliverable.
    ///
    /// Without an explicit status, 100% marks the deliverable completed and
    /// any other value marks it in progress.
    pub async fn report_progress(
        &self,
        deliverable_id: i64,
        percent: u8,
        status: Option<DeliverableStatus>,
        delay_reason: Option<String>,
    ) -> Result<Deliverable> {
        self.own_deliverable(deliverable_id).await?;

        let status = status.unwrap_or(if percent >= 100 {
            DeliverableStatus::Completed
        } else {
            DeliverableStatus::InProgress
        });
        if status == DeliverableStatus::Delayed && delay_reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
            return Err(RecordError::invalid("delay_reasons", "a delayed deliverable needs a reason").into());
        }

        self.repository
            .update_deliverable(
                deliverable_id,
                DeliverableUpdate {
                    current_status: Some(status),
                    progress_percentage: Some(percent),
                    // Leaving the delayed state drops the stale reason
                    delay_reasons: if status == DeliverableStatus::Delayed {
                        delay_reason
                    } else {
                        Some(String::new())
                    },
                    ..Default::default()
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewDeliverable, NewEvent, NewSupplier};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    async fn seed() -> (Repository, i64, i64) {
        let repository = Repository::new_in_memory().unwrap();
        let event = repository
            .create_event(&NewEvent {
                name: "Trade Fair".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
                location: "Hall B".to_string(),
                status: Default::default(),
                budget: 8_000.0,
                description: String::new(),
            })
            .await
            .unwrap();

        let mut deliverable_ids = Vec::new();
        for username in ["tents", "audio"] {
            let supplier = repository
                .create_supplier(&NewSupplier {
                    name: username.to_uppercase(),
                    email: format!("{}@example.com", username),
                    phone: String::new(),
                    specialization: String::new(),
                    username: username.to_string(),
                    rating: 5,
                })
                .await
                .unwrap();
            let (_, deliverables) = repository
                .assign_supplier(
                    event.id,
                    supplier.id,
                    1_000.0,
                    vec![NewDeliverable {
                        item_name: format!("{} kit", username),
                        item_description: String::new(),
                        quantity: 1,
                        unit_price: 500.0,
                        total_value: None,
                        scheduled_delivery_date: None,
                        scheduled_installation_date: None,
                        scheduled_dismantling_date: None,
                    }],
                )
                .await
                .unwrap();
            deliverable_ids.push(deliverables[0].id);
        }

        (repository, deliverable_ids[0], deliverable_ids[1])
    }

    #[tokio::test]
    async fn test_open_unknownUser_shouldBeNotFound() {
        let (repository, _, _) = seed().await;
        let result = SupplierPortal::open(repository, "ghost", "/tmp").await;
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::NotFound { entity: "supplier", .. })
        ));
    }

    #[tokio::test]
    async fn test_assignedDeliverables_shouldOnlyListOwn() {
        let (repository, own, _) = seed().await;
        let portal = SupplierPortal::open(repository, "tents", "/tmp").await.unwrap();

        let deliverables = portal.assigned_deliverables().await.unwrap();
        assert_eq!(deliverables.len(), 1);
        assert_eq!(deliverables[0].id, own);
    }

    #[tokio::test]
    async fn test_comment_onOtherSuppliersDeliverable_shouldBeNotAssigned() {
        let (repository, _, other) = seed().await;
        let portal = SupplierPortal::open(repository, "tents", "/tmp").await.unwrap();

        let err = portal.comment(other, "hello").await.err().unwrap();
        assert_eq!(
            err.downcast_ref::<RecordError>(),
            Some(&RecordError::NotAssigned {
                supplier: "tents".to_string(),
                deliverable: other,
            })
        );
    }

    #[tokio::test]
    async fn test_uploadDocument_shouldStoreCopyAndNoteIt() {
        let (repository, own, _) = seed().await;
        let store = tempdir().unwrap();
        let source_dir = tempdir().unwrap();
        let source = source_dir.path().join("delivery-note.pdf");
        std::fs::write(&source, b"signed note").unwrap();

        let portal = SupplierPortal::open(repository.clone(), "tents", store.path())
            .await
            .unwrap();
        let attachment = portal
            .upload_document(own, AttachmentKind::Delivery, &source, "Signed on arrival")
            .await
            .unwrap();

        assert_eq!(attachment.original_name, "delivery-note.pdf");
        assert_eq!(attachment.size_bytes, 11);
        assert!(Path::new(&attachment.stored_path).starts_with(store.path()));
        assert_eq!(repository.list_attachments(own).await.unwrap().len(), 1);

        let comments = repository.list_comments(own).await.unwrap();
        assert_eq!(comments[0].author, "tents");
        assert!(comments[0].body.starts_with("Uploaded delivery-note.pdf"));
    }

    #[tokio::test]
    async fn test_uploadDocument_withoutDescription_shouldBeInvalid() {
        let (repository, own, _) = seed().await;
        let portal = SupplierPortal::open(repository, "tents", "/tmp").await.unwrap();
        let err = portal
            .upload_document(own, AttachmentKind::Document, Path::new("/tmp/x.pdf"), "  ")
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::Invalid { field: "description", .. })
        ));
    }

    #[tokio::test]
    async fn test_reportProgress_full_shouldComplete() {
        let (repository, own, _) = seed().await;
        let portal = SupplierPortal::open(repository, "tents", "/tmp").await.unwrap();

        let updated = portal.report_progress(own, 100, None, None).await.unwrap();
        assert_eq!(updated.current_status, DeliverableStatus::Completed);
        assert_eq!(updated.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_reportProgress_delayedWithoutReason_shouldBeInvalid() {
        let (repository, own, _) = seed().await;
        let portal = SupplierPortal::open(repository, "tents", "/tmp").await.unwrap();

        assert!(
            portal
                .report_progress(own, 20, Some(DeliverableStatus::Delayed), None)
                .await
                .is_err()
        );
        let delayed = portal
            .report_progress(own, 20, Some(DeliverableStatus::Delayed), Some("Rain".to_string()))
            .await
            .unwrap();
        assert_eq!(delayed.delay_reasons.as_deref(), Some("Rain"));
    }

    #[tokio::test]
    async fn test_reportProgress_afterDelay_shouldClearReason() {
        let (repository, own, _) = seed().await;
        let portal = SupplierPortal::open(repository.clone(), "tents", "/tmp").await.unwrap();

        portal
            .report_progress(own, 20, Some(DeliverableStatus::Delayed), Some("Rain".to_string()))
            .await
            .unwrap();
        let resumed = portal.report_progress(own, 50, None, None).await.unwrap();

        assert_eq!(resumed.current_status, DeliverableStatus::InProgress);
        assert_eq!(resumed.delay_reasons, None);
        let stored = repository.get_deliverable(own).await.unwrap().unwrap();
        assert_eq!(stored.delay_reasons, None);
    }

    #[tokio::test]
    async fn test_uploadDocument_commentRejected_shouldKeepNothing() {
        let (repository, own, _) = seed().await;
        let store = tempdir().unwrap();
        let inbox = tempdir().unwrap();
        let file = inbox.path().join("plan.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();
        repository
            .connection()
            .execute(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER block_comments BEFORE INSERT ON deliverable_comments \
                     BEGIN SELECT RAISE(ABORT, 'comments disabled'); END;",
                )?;
                Ok(())
            })
            .unwrap();
        let portal = SupplierPortal::open(repository.clone(), "tents", store.path()).await.unwrap();

        let result = portal
            .upload_document(own, AttachmentKind::Document, &file, "Floor plan")
            .await;

        assert!(result.is_err());
        assert!(repository.list_attachments(own).await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(store.path()).unwrap().count(), 0);
    }
}
