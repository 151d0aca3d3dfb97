/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 *
 * Lookups return `Option`; updates and deletes of missing rows fail with
 * [`RecordError::NotFound`], carried inside the `anyhow::Error`.
 */

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

use super::connection::DatabaseConnection;
use super::models::{
    AssignedSupplier, AssignmentUpdate, Attachment, Deliverable, DeliverableComment,
    DeliverableStatus, DeliverableUpdate, Event, EventDetails, EventStatus, EventSupplier,
    EventUpdate, MilestoneKind, NewAttachment, NewDeliverable, NewEvent, NewSupplier, Overview,
    Supplier, SupplierStatus,
};
use crate::errors::RecordError;

const EVENT_COLUMNS: &str =
    "id, name, date, location, status, budget, description, created_at, updated_at";

const SUPPLIER_COLUMNS: &str =
    "id, name, email, phone, specialization, username, rating, status, created_at";

const ASSIGNMENT_COLUMNS: &str =
    "id, event_id, supplier_id, allocated_budget, status, performance, created_at";

const DELIVERABLE_COLUMNS: &str = "id, event_id, supplier_id, item_name, item_description, \
     quantity, unit_price, total_value, scheduled_delivery_date, actual_delivery_date, \
     scheduled_installation_date, actual_installation_date, scheduled_dismantling_date, \
     actual_dismantling_date, current_status, progress_percentage, delay_reasons, \
     quality_rating, created_at, updated_at";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Event Operations
    // =========================================================================

    /// Create a new event and return it with its generated id
    pub async fn create_event(&self, event: &NewEvent) -> Result<Event> {
        event.validate()?;
        let event = event.clone();
        let now = chrono::Utc::now().to_rfc3339();

        let created = self
            .db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO events (name, date, location, status, budget, description, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                    "#,
                    params![
                        event.name.trim(),
                        event.date.to_string(),
                        event.location.trim(),
                        event.status.to_string(),
                        event.budget,
                        event.description,
                        now,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                require(Self::get_event_sync(conn, id)?, "event", id)
            })
            .await?;

        info!("Created event {} '{}'", created.id, created.name);
        Ok(created)
    }

    /// Get an event by ID
    pub async fn get_event(&self, event_id: i64) -> Result<Option<Event>> {
        self.db
            .execute_async(move |conn| Self::get_event_sync(conn, event_id))
            .await
    }

    /// Get an event by ID (synchronous version for use within transactions)
    fn get_event_sync(conn: &Connection, event_id: i64) -> Result<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS);
        let event = conn.query_row(&sql, [event_id], event_from_row).optional()?;
        Ok(event)
    }

    /// List events ordered by date, optionally filtered by status
    pub async fn list_events(&self, status_filter: Option<EventStatus>) -> Result<Vec<Event>> {
        self.db
            .execute_async(move |conn| {
                let events = match status_filter {
                    Some(status) => {
                        let sql = format!(
                            "SELECT {} FROM events WHERE status = ?1 ORDER BY date, id",
                            EVENT_COLUMNS
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map([status.to_string()], event_from_row)?
                            .collect::<rusqlite::Result<Vec<_>>>()?
                    }
                    None => {
                        let sql = format!("SELECT {} FROM events ORDER BY date, id", EVENT_COLUMNS);
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map([], event_from_row)?
                            .collect::<rusqlite::Result<Vec<_>>>()?
                    }
                };
                Ok(events)
            })
            .await
    }

    /// Apply a partial update to an event
    pub async fn update_event(&self, event_id: i64, update: EventUpdate) -> Result<Event> {
        update.validate()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let mut event = require(Self::get_event_sync(tx, event_id)?, "event", event_id)?;
                if update.is_empty() {
                    return Ok(event);
                }
                update.apply(&mut event);
                event.updated_at = now;

                tx.execute(
                    r#"
                    UPDATE events
                    SET name = ?1, date = ?2, location = ?3, status = ?4, budget = ?5,
                        description = ?6, updated_at = ?7
                    WHERE id = ?8
                    "#,
                    params![
                        event.name,
                        event.date.to_string(),
                        event.location,
                        event.status.to_string(),
                        event.budget,
                        event.description,
                        event.updated_at,
                        event_id,
                    ],
                )?;
                debug!("Updated event {}", event_id);
                Ok(event)
            })
            .await
    }

    /// Delete an event; assignments, deliverables, comments and attachments cascade
    pub async fn delete_event(&self, event_id: i64) -> Result<()> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
                if deleted == 0 {
                    return Err(RecordError::not_found("event", event_id).into());
                }
                info!("Deleted event {}", event_id);
                Ok(())
            })
            .await
    }

    /// Load an event together with its suppliers and deliverables
    pub async fn get_event_details(&self, event_id: i64) -> Result<EventDetails> {
        self.db
            .execute_async(move |conn| {
                let event = require(Self::get_event_sync(conn, event_id)?, "event", event_id)?;
                Self::details_for_event_sync(conn, event)
            })
            .await
    }

    /// Details for every event, ordered by date
    pub async fn list_event_details(&self) -> Result<Vec<EventDetails>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM events ORDER BY date, id", EVENT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let events = stmt
                    .query_map([], event_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                events
                    .into_iter()
                    .map(|event| Self::details_for_event_sync(conn, event))
                    .collect()
            })
            .await
    }

    fn details_for_event_sync(conn: &Connection, event: Event) -> Result<EventDetails> {
        let mut stmt = conn.prepare(
            r#"
            SELECT es.id, es.event_id, es.supplier_id, es.allocated_budget, es.status, es.performance, es.created_at,
                   s.id, s.name, s.email, s.phone, s.specialization, s.username, s.rating, s.status, s.created_at
            FROM event_suppliers es
            JOIN suppliers s ON s.id = es.supplier_id
            WHERE es.event_id = ?1
            ORDER BY s.name, es.id
            "#,
        )?;
        let suppliers = stmt
            .query_map([event.id], |row| {
                Ok(AssignedSupplier {
                    assignment: assignment_from_row(row)?,
                    supplier: supplier_from_row_at(row, 7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let deliverables = Self::deliverables_where_sync(conn, "event_id = ?1", event.id)?;

        Ok(EventDetails {
            event,
            suppliers,
            deliverables,
        })
    }

    // =========================================================================
    // Supplier Operations
    // =========================================================================

    /// Create a supplier; email and username must be unique
    pub async fn create_supplier(&self, supplier: &NewSupplier) -> Result<Supplier> {
        supplier.validate()?;
        let supplier = supplier.clone();
        let now = chrono::Utc::now().to_rfc3339();

        let created = self
            .db
            .transaction_async(move |tx| {
                let email = supplier.email.trim().to_lowercase();
                let username = supplier.username.trim().to_string();

                let email_taken: bool = tx.query_row(
                    "SELECT COUNT(*) FROM suppliers WHERE email = ?1",
                    [&email],
                    |row| row.get(0),
                )?;
                if email_taken {
                    return Err(RecordError::Duplicate(format!(
                        "a supplier with email '{}' already exists",
                        email
                    ))
                    .into());
                }

                let username_taken: bool = tx.query_row(
                    "SELECT COUNT(*) FROM suppliers WHERE username = ?1",
                    [&username],
                    |row| row.get(0),
                )?;
                if username_taken {
                    return Err(RecordError::Duplicate(format!(
                        "a supplier with username '{}' already exists",
                        username
                    ))
                    .into());
                }

                tx.execute(
                    r#"
                    INSERT INTO suppliers (name, email, phone, specialization, username, rating, status, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        supplier.name.trim(),
                        email,
                        supplier.phone,
                        supplier.specialization,
                        username,
                        supplier.rating,
                        SupplierStatus::Active.to_string(),
                        now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                require(Self::get_supplier_sync(tx, id)?, "supplier", id)
            })
            .await?;

        info!("Created supplier {} '{}'", created.id, created.name);
        Ok(created)
    }

    /// Get a supplier by ID
    pub async fn get_supplier(&self, supplier_id: i64) -> Result<Option<Supplier>> {
        self.db
            .execute_async(move |conn| Self::get_supplier_sync(conn, supplier_id))
            .await
    }

    fn get_supplier_sync(conn: &Connection, supplier_id: i64) -> Result<Option<Supplier>> {
        let sql = format!("SELECT {} FROM suppliers WHERE id = ?1", SUPPLIER_COLUMNS);
        let supplier = conn
            .query_row(&sql, [supplier_id], |row| supplier_from_row_at(row, 0))
            .optional()?;
        Ok(supplier)
    }

    /// Find a supplier by portal username
    pub async fn find_supplier_by_username(&self, username: &str) -> Result<Option<Supplier>> {
        let username = username.trim().to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM suppliers WHERE username = ?1", SUPPLIER_COLUMNS);
                let supplier = conn
                    .query_row(&sql, [&username], |row| supplier_from_row_at(row, 0))
                    .optional()?;
                Ok(supplier)
            })
            .await
    }

    /// List suppliers by name, optionally filtered by status
    pub async fn list_suppliers(
        &self,
        status_filter: Option<SupplierStatus>,
    ) -> Result<Vec<Supplier>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM suppliers WHERE (?1 IS NULL OR status = ?1) ORDER BY name, id",
                    SUPPLIER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let suppliers = stmt
                    .query_map([status_filter.map(|s| s.to_string())], |row| {
                        supplier_from_row_at(row, 0)
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(suppliers)
            })
            .await
    }

    /// Activate or deactivate a supplier
    pub async fn update_supplier_status(
        &self,
        supplier_id: i64,
        status: SupplierStatus,
    ) -> Result<Supplier> {
        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE suppliers SET status = ?1 WHERE id = ?2",
                    params![status.to_string(), supplier_id],
                )?;
                if updated == 0 {
                    return Err(RecordError::not_found("supplier", supplier_id).into());
                }
                require(Self::get_supplier_sync(conn, supplier_id)?, "supplier", supplier_id)
            })
            .await
    }

    /// Delete a supplier together with its assignments and deliverables
    pub async fn delete_supplier(&self, supplier_id: i64) -> Result<()> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM suppliers WHERE id = ?1", [supplier_id])?;
                if deleted == 0 {
                    return Err(RecordError::not_found("supplier", supplier_id).into());
                }
                info!("Deleted supplier {}", supplier_id);
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Assignment Operations
    // =========================================================================

    /// Attach a supplier to an event together with its deliverables, atomically
    pub async fn assign_supplier(
        &self,
        event_id: i64,
        supplier_id: i64,
        allocated_budget: f64,
        deliverables: Vec<NewDeliverable>,
    ) -> Result<(EventSupplier, Vec<Deliverable>)> {
        AssignmentUpdate {
            allocated_budget: Some(allocated_budget),
            ..Default::default()
        }
        .validate()?;
        for deliverable in &deliverables {
            deliverable.validate()?;
        }
        let now = chrono::Utc::now().to_rfc3339();

        let (assignment, created) = self
            .db
            .transaction_async(move |tx| {
                require(Self::get_event_sync(tx, event_id)?, "event", event_id)?;
                require(Self::get_supplier_sync(tx, supplier_id)?, "supplier", supplier_id)?;

                if Self::get_assignment_sync(tx, event_id, supplier_id)?.is_some() {
                    return Err(RecordError::Duplicate(format!(
                        "supplier {} is already assigned to event {}",
                        supplier_id, event_id
                    ))
                    .into());
                }

                tx.execute(
                    r#"
                    INSERT INTO event_suppliers (event_id, supplier_id, allocated_budget, status, performance, created_at)
                    VALUES (?1, ?2, ?3, 'pending', 5, ?4)
                    "#,
                    params![event_id, supplier_id, allocated_budget, now],
                )?;
                let assignment = require(
                    Self::get_assignment_sync(tx, event_id, supplier_id)?,
                    "assignment",
                    format!("{}/{}", event_id, supplier_id),
                )?;

                let mut created = Vec::with_capacity(deliverables.len());
                for deliverable in &deliverables {
                    created.push(Self::insert_deliverable_sync(
                        tx,
                        event_id,
                        supplier_id,
                        deliverable,
                        &now,
                    )?);
                }

                Ok((assignment, created))
            })
            .await?;

        info!(
            "Assigned supplier {} to event {} with {} deliverables",
            supplier_id,
            event_id,
            created.len()
        );
        Ok((assignment, created))
    }

    /// Get the assignment of a supplier on an event
    pub async fn get_assignment(
        &self,
        event_id: i64,
        supplier_id: i64,
    ) -> Result<Option<EventSupplier>> {
        self.db
            .execute_async(move |conn| Self::get_assignment_sync(conn, event_id, supplier_id))
            .await
    }

    fn get_assignment_sync(
        conn: &Connection,
        event_id: i64,
        supplier_id: i64,
    ) -> Result<Option<EventSupplier>> {
        let sql = format!(
            "SELECT {} FROM event_suppliers WHERE event_id = ?1 AND supplier_id = ?2",
            ASSIGNMENT_COLUMNS
        );
        let assignment = conn
            .query_row(&sql, [event_id, supplier_id], assignment_from_row)
            .optional()?;
        Ok(assignment)
    }

    /// Update status, performance or budget of an assignment
    pub async fn update_assignment(
        &self,
        event_id: i64,
        supplier_id: i64,
        update: AssignmentUpdate,
    ) -> Result<EventSupplier> {
        update.validate()?;

        self.db
            .transaction_async(move |tx| {
                let mut assignment = require(
                    Self::get_assignment_sync(tx, event_id, supplier_id)?,
                    "assignment",
                    format!("{}/{}", event_id, supplier_id),
                )?;
                if let Some(status) = update.status {
                    assignment.status = status;
                }
                if let Some(performance) = update.performance {
                    assignment.performance = performance;
                }
                if let Some(budget) = update.allocated_budget {
                    assignment.allocated_budget = budget;
                }

                tx.execute(
                    "UPDATE event_suppliers SET status = ?1, performance = ?2, allocated_budget = ?3 WHERE id = ?4",
                    params![
                        assignment.status.to_string(),
                        assignment.performance,
                        assignment.allocated_budget,
                        assignment.id,
                    ],
                )?;
                Ok(assignment)
            })
            .await
    }

    /// Remove a supplier from an event; returns the number of deliverables removed
    pub async fn remove_supplier_from_event(&self, event_id: i64, supplier_id: i64) -> Result<usize> {
        let removed = self
            .db
            .transaction_async(move |tx| {
                let deliverables = tx.execute(
                    "DELETE FROM deliverables WHERE event_id = ?1 AND supplier_id = ?2",
                    [event_id, supplier_id],
                )?;
                let assignments = tx.execute(
                    "DELETE FROM event_suppliers WHERE event_id = ?1 AND supplier_id = ?2",
                    [event_id, supplier_id],
                )?;
                if assignments == 0 {
                    // Rolls back the deliverable deletion
                    return Err(RecordError::not_found(
                        "assignment",
                        format!("{}/{}", event_id, supplier_id),
                    )
                    .into());
                }
                Ok(deliverables)
            })
            .await?;

        info!(
            "Removed supplier {} from event {} ({} deliverables)",
            supplier_id, event_id, removed
        );
        Ok(removed)
    }

    // =========================================================================
    // Deliverable Operations
    // =========================================================================

    /// Add a deliverable for a supplier already assigned to the event
    pub async fn add_deliverable(
        &self,
        event_id: i64,
        supplier_id: i64,
        deliverable: &NewDeliverable,
    ) -> Result<Deliverable> {
        deliverable.validate()?;
        let deliverable = deliverable.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                require(
                    Self::get_assignment_sync(tx, event_id, supplier_id)?,
                    "assignment",
                    format!("{}/{}", event_id, supplier_id),
                )?;
                Self::insert_deliverable_sync(tx, event_id, supplier_id, &deliverable, &now)
            })
            .await
    }

    fn insert_deliverable_sync(
        conn: &Connection,
        event_id: i64,
        supplier_id: i64,
        deliverable: &NewDeliverable,
        now: &str,
    ) -> Result<Deliverable> {
        conn.execute(
            r#"
            INSERT INTO deliverables (
                event_id, supplier_id, item_name, item_description, quantity, unit_price, total_value,
                scheduled_delivery_date, scheduled_installation_date, scheduled_dismantling_date,
                current_status, progress_percentage, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)
            "#,
            params![
                event_id,
                supplier_id,
                deliverable.item_name.trim(),
                deliverable.item_description,
                deliverable.quantity,
                deliverable.unit_price,
                deliverable.resolved_total_value(),
                deliverable.scheduled_delivery_date.map(|d| d.to_string()),
                deliverable.scheduled_installation_date.map(|d| d.to_string()),
                deliverable.scheduled_dismantling_date.map(|d| d.to_string()),
                DeliverableStatus::NotStarted.to_string(),
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted deliverable {} for event {}", id, event_id);
        require(Self::get_deliverable_sync(conn, id)?, "deliverable", id)
    }

    /// Get a deliverable by ID
    pub async fn get_deliverable(&self, deliverable_id: i64) -> Result<Option<Deliverable>> {
        self.db
            .execute_async(move |conn| Self::get_deliverable_sync(conn, deliverable_id))
            .await
    }

    fn get_deliverable_sync(conn: &Connection, deliverable_id: i64) -> Result<Option<Deliverable>> {
        let sql = format!("SELECT {} FROM deliverables WHERE id = ?1", DELIVERABLE_COLUMNS);
        let deliverable = conn
            .query_row(&sql, [deliverable_id], deliverable_from_row)
            .optional()?;
        Ok(deliverable)
    }

    fn deliverables_where_sync(
        conn: &Connection,
        predicate: &str,
        key: i64,
    ) -> Result<Vec<Deliverable>> {
        let sql = format!(
            "SELECT {} FROM deliverables WHERE {} ORDER BY id",
            DELIVERABLE_COLUMNS, predicate
        );
        let mut stmt = conn.prepare(&sql)?;
        let deliverables = stmt
            .query_map([key], deliverable_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deliverables)
    }

    /// All deliverables of an event
    pub async fn list_deliverables_for_event(&self, event_id: i64) -> Result<Vec<Deliverable>> {
        self.db
            .execute_async(move |conn| Self::deliverables_where_sync(conn, "event_id = ?1", event_id))
            .await
    }

    /// All deliverables of a supplier, across events
    pub async fn list_deliverables_for_supplier(&self, supplier_id: i64) -> Result<Vec<Deliverable>> {
        self.db
            .execute_async(move |conn| {
                Self::deliverables_where_sync(conn, "supplier_id = ?1", supplier_id)
            })
            .await
    }

    /// Apply a partial update to a deliverable
    pub async fn update_deliverable(
        &self,
        deliverable_id: i64,
        update: DeliverableUpdate,
    ) -> Result<Deliverable> {
        update.validate()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let mut deliverable = require(
                    Self::get_deliverable_sync(tx, deliverable_id)?,
                    "deliverable",
                    deliverable_id,
                )?;
                update.apply(&mut deliverable);
                deliverable.updated_at = now;
                Self::save_deliverable_sync(tx, &deliverable)?;
                Ok(deliverable)
            })
            .await
    }

    /// Record the actual date of a milestone.
    ///
    /// Progress is raised to at least the milestone progress; the status moves
    /// to `In Progress`, or `Completed` once all three milestones are recorded.
    pub async fn record_milestone(
        &self,
        deliverable_id: i64,
        kind: MilestoneKind,
        date: NaiveDate,
    ) -> Result<Deliverable> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let mut deliverable = require(
                    Self::get_deliverable_sync(tx, deliverable_id)?,
                    "deliverable",
                    deliverable_id,
                )?;
                match kind {
                    MilestoneKind::Delivery => deliverable.actual_delivery_date = Some(date),
                    MilestoneKind::Installation => deliverable.actual_installation_date = Some(date),
                    MilestoneKind::Dismantling => deliverable.actual_dismantling_date = Some(date),
                }

                let milestone = deliverable.milestone_progress();
                deliverable.progress_percentage = deliverable.progress_percentage.max(milestone);
                if milestone == 100 {
                    deliverable.current_status = DeliverableStatus::Completed;
                } else if deliverable.current_status == DeliverableStatus::NotStarted {
                    deliverable.current_status = DeliverableStatus::InProgress;
                }
                deliverable.updated_at = now;

                Self::save_deliverable_sync(tx, &deliverable)?;
                debug!(
                    "Recorded {} on {} for deliverable {} ({}%)",
                    kind, date, deliverable_id, deliverable.progress_percentage
                );
                Ok(deliverable)
            })
            .await
    }

    fn save_deliverable_sync(conn: &Connection, deliverable: &Deliverable) -> Result<()> {
        conn.execute(
            r#"
            UPDATE deliverables
            SET quantity = ?1, unit_price = ?2, total_value = ?3,
                actual_delivery_date = ?4, actual_installation_date = ?5, actual_dismantling_date = ?6,
                current_status = ?7, progress_percentage = ?8, delay_reasons = ?9,
                quality_rating = ?10, updated_at = ?11
            WHERE id = ?12
            "#,
            params![
                deliverable.quantity,
                deliverable.unit_price,
                deliverable.total_value,
                deliverable.actual_delivery_date.map(|d| d.to_string()),
                deliverable.actual_installation_date.map(|d| d.to_string()),
                deliverable.actual_dismantling_date.map(|d| d.to_string()),
                deliverable.current_status.to_string(),
                deliverable.progress_percentage,
                deliverable.delay_reasons,
                deliverable.quality_rating,
                deliverable.updated_at,
                deliverable.id,
            ],
        )?;
        Ok(())
    }

    /// Add a comment to a deliverable
    pub async fn add_comment(
        &self,
        deliverable_id: i64,
        author: &str,
        body: &str,
    ) -> Result<DeliverableComment> {
        let body = comment_body(body)?;
        let author = author.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| Self::insert_comment_sync(conn, deliverable_id, author, body, now))
            .await
    }

    fn insert_comment_sync(
        conn: &Connection,
        deliverable_id: i64,
        author: String,
        body: String,
        now: String,
    ) -> Result<DeliverableComment> {
        require(
            Self::get_deliverable_sync(conn, deliverable_id)?,
            "deliverable",
            deliverable_id,
        )?;
        conn.execute(
            "INSERT INTO deliverable_comments (deliverable_id, author, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![deliverable_id, author, body, now],
        )?;
        Ok(DeliverableComment {
            id: conn.last_insert_rowid(),
            deliverable_id,
            author,
            body,
            created_at: now,
        })
    }

    /// Comments on a deliverable, oldest first
    pub async fn list_comments(&self, deliverable_id: i64) -> Result<Vec<DeliverableComment>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, deliverable_id, author, body, created_at
                    FROM deliverable_comments
                    WHERE deliverable_id = ?1
                    ORDER BY id
                    "#,
                )?;
                let comments = stmt
                    .query_map([deliverable_id], |row| {
                        Ok(DeliverableComment {
                            id: row.get(0)?,
                            deliverable_id: row.get(1)?,
                            author: row.get(2)?,
                            body: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(comments)
            })
            .await
    }

    /// Record an uploaded file
    pub async fn add_attachment(&self, attachment: NewAttachment) -> Result<Attachment> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| Self::insert_attachment_sync(conn, attachment, now))
            .await
    }

    /// Record an uploaded file and a comment about it in one transaction
    pub async fn add_attachment_with_comment(
        &self,
        attachment: NewAttachment,
        author: &str,
        body: &str,
    ) -> Result<(Attachment, DeliverableComment)> {
        let body = comment_body(body)?;
        let author = author.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let deliverable_id = attachment.deliverable_id;
                let attachment = Self::insert_attachment_sync(tx, attachment, now.clone())?;
                let comment = Self::insert_comment_sync(tx, deliverable_id, author, body, now)?;
                Ok((attachment, comment))
            })
            .await
    }

    fn insert_attachment_sync(conn: &Connection, attachment: NewAttachment, now: String) -> Result<Attachment> {
        require(
            Self::get_deliverable_sync(conn, attachment.deliverable_id)?,
            "deliverable",
            attachment.deliverable_id,
        )?;
        conn.execute(
            r#"
            INSERT INTO attachments (deliverable_id, kind, original_name, stored_path, sha256, size_bytes, description, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                attachment.deliverable_id,
                attachment.kind.to_string(),
                attachment.original_name,
                attachment.stored_path,
                attachment.sha256,
                attachment.size_bytes as i64,
                attachment.description,
                now,
            ],
        )?;
        Ok(Attachment {
            id: conn.last_insert_rowid(),
            deliverable_id: attachment.deliverable_id,
            kind: attachment.kind,
            original_name: attachment.original_name,
            stored_path: attachment.stored_path,
            sha256: attachment.sha256,
            size_bytes: attachment.size_bytes,
            description: attachment.description,
            uploaded_at: now,
        })
    }

    /// Attachments of a deliverable, oldest first
    pub async fn list_attachments(&self, deliverable_id: i64) -> Result<Vec<Attachment>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, deliverable_id, kind, original_name, stored_path, sha256, size_bytes, description, uploaded_at
                    FROM attachments
                    WHERE deliverable_id = ?1
                    ORDER BY id
                    "#,
                )?;
                let attachments = stmt
                    .query_map([deliverable_id], |row| {
                        Ok(Attachment {
                            id: row.get(0)?,
                            deliverable_id: row.get(1)?,
                            kind: parse_column(row, 2)?,
                            original_name: row.get(3)?,
                            stored_path: row.get(4)?,
                            sha256: row.get(5)?,
                            size_bytes: row.get::<_, i64>(6)?.max(0) as u64,
                            description: row.get(7)?,
                            uploaded_at: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(attachments)
            })
            .await
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Aggregate figures across all events
    pub async fn overview(&self) -> Result<Overview> {
        let details = self.list_event_details().await?;
        Ok(Overview::from_details(&details))
    }
}

/// Trimmed comment text; empty comments are rejected
fn comment_body(body: &str) -> Result<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(RecordError::invalid("comment", "must not be empty").into());
    }
    Ok(body.to_string())
}

/// Turn a missing row into a `NotFound` error
fn require<T>(value: Option<T>, entity: &'static str, id: impl ToString) -> Result<T> {
    value.ok_or_else(|| RecordError::not_found(entity, id).into())
}

/// Parse a TEXT column through `FromStr`; unknown values are an error
fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = RecordError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        date: parse_date(row, 2)?,
        location: row.get(3)?,
        status: parse_column(row, 4)?,
        budget: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Supplier columns starting at `offset`, so joined rows can reuse it
fn supplier_from_row_at(row: &Row, offset: usize) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        phone: row.get(offset + 3)?,
        specialization: row.get(offset + 4)?,
        username: row.get(offset + 5)?,
        rating: row.get(offset + 6)?,
        status: parse_column(row, offset + 7)?,
        created_at: row.get(offset + 8)?,
    })
}

fn assignment_from_row(row: &Row) -> rusqlite::Result<EventSupplier> {
    Ok(EventSupplier {
        id: row.get(0)?,
        event_id: row.get(1)?,
        supplier_id: row.get(2)?,
        allocated_budget: row.get(3)?,
        status: parse_column(row, 4)?,
        performance: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn deliverable_from_row(row: &Row) -> rusqlite::Result<Deliverable> {
    Ok(Deliverable {
        id: row.get(0)?,
        event_id: row.get(1)?,
        supplier_id: row.get(2)?,
        item_name: row.get(3)?,
        item_description: row.get(4)?,
        quantity: row.get(5)?,
        unit_price: row.get(6)?,
        total_value: row.get(7)?,
        scheduled_delivery_date: parse_optional_date(row, 8)?,
        actual_delivery_date: parse_optional_date(row, 9)?,
        scheduled_installation_date: parse_optional_date(row, 10)?,
        actual_installation_date: parse_optional_date(row, 11)?,
        scheduled_dismantling_date: parse_optional_date(row, 12)?,
        actual_dismantling_date: parse_optional_date(row, 13)?,
        current_status: parse_column(row, 14)?,
        progress_percentage: row.get(15)?,
        delay_reasons: row.get(16)?,
        quality_rating: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}
