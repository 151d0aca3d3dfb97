/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data. Input structs (`NewEvent`,
 * `NewSupplier`, ...) validate themselves before anything is written.
 */

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RecordError;

/// Local part, `@`, then a dotted domain; no whitespace anywhere
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").unwrap());

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventStatus {
    /// Event is being prepared
    #[default]
    Planning,
    /// Event is running
    Active,
    /// Event is over
    Completed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Planning => write!(f, "Planning"),
            EventStatus::Active => write!(f, "Active"),
            EventStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(EventStatus::Planning),
            "active" => Ok(EventStatus::Active),
            "completed" => Ok(EventStatus::Completed),
            _ => Err(RecordError::invalid("event status", s)),
        }
    }
}

/// Supplier account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for SupplierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplierStatus::Active => write!(f, "active"),
            SupplierStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for SupplierStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SupplierStatus::Active),
            "inactive" => Ok(SupplierStatus::Inactive),
            _ => Err(RecordError::invalid("supplier status", s)),
        }
    }
}

/// Status of a supplier's engagement on one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "pending"),
            AssignmentStatus::Confirmed => write!(f, "confirmed"),
            AssignmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AssignmentStatus::Pending),
            "confirmed" => Ok(AssignmentStatus::Confirmed),
            "completed" => Ok(AssignmentStatus::Completed),
            _ => Err(RecordError::invalid("assignment status", s)),
        }
    }
}

/// Progress state of a deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliverableStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Delayed,
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliverableStatus::NotStarted => write!(f, "Not Started"),
            DeliverableStatus::InProgress => write!(f, "In Progress"),
            DeliverableStatus::Completed => write!(f, "Completed"),
            DeliverableStatus::Delayed => write!(f, "Delayed"),
        }
    }
}

impl std::str::FromStr for DeliverableStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept "In Progress", "in-progress" and "in_progress" alike
        let normalized: String = s
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        match normalized.trim() {
            "not started" => Ok(DeliverableStatus::NotStarted),
            "in progress" => Ok(DeliverableStatus::InProgress),
            "completed" => Ok(DeliverableStatus::Completed),
            "delayed" => Ok(DeliverableStatus::Delayed),
            _ => Err(RecordError::invalid("deliverable status", s)),
        }
    }
}

/// The three dated milestones of a deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Delivery,
    Installation,
    Dismantling,
}

impl MilestoneKind {
    /// Share of the milestone progress this milestone contributes
    pub fn weight(&self) -> u8 {
        match self {
            MilestoneKind::Delivery => 33,
            MilestoneKind::Installation => 33,
            MilestoneKind::Dismantling => 34,
        }
    }

    /// Column holding the actual date of this milestone
    pub(crate) fn actual_column(&self) -> &'static str {
        match self {
            MilestoneKind::Delivery => "actual_delivery_date",
            MilestoneKind::Installation => "actual_installation_date",
            MilestoneKind::Dismantling => "actual_dismantling_date",
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneKind::Delivery => write!(f, "delivery"),
            MilestoneKind::Installation => write!(f, "installation"),
            MilestoneKind::Dismantling => write!(f, "dismantling"),
        }
    }
}

impl std::str::FromStr for MilestoneKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delivery" => Ok(MilestoneKind::Delivery),
            "installation" => Ok(MilestoneKind::Installation),
            "dismantling" => Ok(MilestoneKind::Dismantling),
            _ => Err(RecordError::invalid("milestone", s)),
        }
    }
}

/// What an uploaded file documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Delivery,
    Installation,
    Dismantling,
    #[default]
    Document,
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Delivery => write!(f, "delivery"),
            AttachmentKind::Installation => write!(f, "installation"),
            AttachmentKind::Dismantling => write!(f, "dismantling"),
            AttachmentKind::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delivery" => Ok(AttachmentKind::Delivery),
            "installation" => Ok(AttachmentKind::Installation),
            "dismantling" => Ok(AttachmentKind::Dismantling),
            "document" => Ok(AttachmentKind::Document),
            _ => Err(RecordError::invalid("attachment kind", s)),
        }
    }
}

/// Event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
    pub status: EventStatus,
    /// Overall event budget
    pub budget: f64,
    pub description: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Input for creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub description: String,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_text("location", &self.location)?;
        require_amount("budget", self.budget)
    }
}

/// Partial update of an event; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub budget: Option<f64>,
    pub description: Option<String>,
}

impl EventUpdate {
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(location) = &self.location {
            require_text("location", location)?;
        }
        if let Some(budget) = self.budget {
            require_amount("budget", budget)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.status.is_none()
            && self.budget.is_none()
            && self.description.is_none()
    }

    pub(crate) fn apply(self, event: &mut Event) {
        if let Some(name) = self.name {
            event.name = name;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(budget) = self.budget {
            event.budget = budget;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
    }
}

/// Supplier record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    /// Portal login name
    pub username: String,
    /// Agency rating, 1 to 5
    pub rating: u8,
    pub status: SupplierStatus,
    pub created_at: String,
}

/// Input for creating a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub specialization: String,
    pub username: String,
    #[serde(default = "default_rating")]
    pub rating: u8,
}

fn default_rating() -> u8 {
    5
}

impl NewSupplier {
    pub fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_email(&self.email)?;
        require_text("username", &self.username)?;
        if self.username.chars().any(char::is_whitespace) {
            return Err(RecordError::invalid("username", "must not contain whitespace"));
        }
        require_score("rating", self.rating)
    }
}

/// Supplier attached to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSupplier {
    pub id: i64,
    pub event_id: i64,
    pub supplier_id: i64,
    pub allocated_budget: f64,
    pub status: AssignmentStatus,
    /// Performance score, 1 to 5
    pub performance: u8,
    pub created_at: String,
}

/// Assignment joined with its supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedSupplier {
    pub assignment: EventSupplier,
    pub supplier: Supplier,
}

/// Partial update of an assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    pub status: Option<AssignmentStatus>,
    pub performance: Option<u8>,
    pub allocated_budget: Option<f64>,
}

impl AssignmentUpdate {
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(performance) = self.performance {
            require_score("performance", performance)?;
        }
        if let Some(budget) = self.allocated_budget {
            require_amount("allocated budget", budget)?;
        }
        Ok(())
    }
}

/// A line item a supplier delivers for an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: i64,
    pub event_id: i64,
    pub supplier_id: i64,
    pub item_name: String,
    pub item_description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_value: f64,
    pub scheduled_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub scheduled_installation_date: Option<NaiveDate>,
    pub actual_installation_date: Option<NaiveDate>,
    pub scheduled_dismantling_date: Option<NaiveDate>,
    pub actual_dismantling_date: Option<NaiveDate>,
    pub current_status: DeliverableStatus,
    /// Self-reported progress, 0 to 100
    pub progress_percentage: u8,
    pub delay_reasons: Option<String>,
    pub quality_rating: Option<u8>,
    pub created_at: String,
    pub updated_at: String,
}

impl Deliverable {
    /// Progress derived from the recorded milestones: 33 + 33 + 34.
    pub fn milestone_progress(&self) -> u8 {
        [
            (MilestoneKind::Delivery, self.actual_delivery_date),
            (MilestoneKind::Installation, self.actual_installation_date),
            (MilestoneKind::Dismantling, self.actual_dismantling_date),
        ]
        .iter()
        .filter(|(_, date)| date.is_some())
        .map(|(kind, _)| kind.weight())
        .sum()
    }

    pub fn actual_date(&self, kind: MilestoneKind) -> Option<NaiveDate> {
        match kind {
            MilestoneKind::Delivery => self.actual_delivery_date,
            MilestoneKind::Installation => self.actual_installation_date,
            MilestoneKind::Dismantling => self.actual_dismantling_date,
        }
    }

    pub fn scheduled_date(&self, kind: MilestoneKind) -> Option<NaiveDate> {
        match kind {
            MilestoneKind::Delivery => self.scheduled_delivery_date,
            MilestoneKind::Installation => self.scheduled_installation_date,
            MilestoneKind::Dismantling => self.scheduled_dismantling_date,
        }
    }
}

/// Input for creating a deliverable; also the shape of the `assign` JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliverable {
    pub item_name: String,
    #[serde(default)]
    pub item_description: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
    /// Defaults to `quantity * unit_price`
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub scheduled_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_installation_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_dismantling_date: Option<NaiveDate>,
}

impl NewDeliverable {
    pub fn validate(&self) -> Result<(), RecordError> {
        require_text("item name", &self.item_name)?;
        if self.quantity == 0 {
            return Err(RecordError::invalid("quantity", "must be greater than zero"));
        }
        require_amount("unit price", self.unit_price)?;
        if let Some(total) = self.total_value {
            require_amount("total value", total)?;
        }
        Ok(())
    }

    pub fn resolved_total_value(&self) -> f64 {
        self.total_value
            .unwrap_or(self.quantity as f64 * self.unit_price)
    }
}

/// Partial update of a deliverable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverableUpdate {
    pub current_status: Option<DeliverableStatus>,
    pub progress_percentage: Option<u8>,
    pub delay_reasons: Option<String>,
    pub quality_rating: Option<u8>,
    pub quantity: Option<u32>,
    pub unit_price: Option<f64>,
}

impl DeliverableUpdate {
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(progress) = self.progress_percentage {
            if progress > 100 {
                return Err(RecordError::invalid(
                    "progress",
                    format!("{} is outside 0..=100", progress),
                ));
            }
        }
        if let Some(rating) = self.quality_rating {
            require_score("quality rating", rating)?;
        }
        if self.quantity == Some(0) {
            return Err(RecordError::invalid("quantity", "must be greater than zero"));
        }
        if let Some(price) = self.unit_price {
            require_amount("unit price", price)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, deliverable: &mut Deliverable) {
        if let Some(status) = self.current_status {
            deliverable.current_status = status;
        }
        if let Some(progress) = self.progress_percentage {
            deliverable.progress_percentage = progress;
        }
        if let Some(reasons) = self.delay_reasons {
            deliverable.delay_reasons = if reasons.trim().is_empty() {
                None
            } else {
                Some(reasons)
            };
        }
        if let Some(rating) = self.quality_rating {
            deliverable.quality_rating = Some(rating);
        }
        let repriced = self.quantity.is_some() || self.unit_price.is_some();
        if let Some(quantity) = self.quantity {
            deliverable.quantity = quantity;
        }
        if let Some(price) = self.unit_price {
            deliverable.unit_price = price;
        }
        if repriced {
            deliverable.total_value = deliverable.quantity as f64 * deliverable.unit_price;
        }
    }
}

/// Comment left on a deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableComment {
    pub id: i64,
    pub deliverable_id: i64,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// File uploaded for a deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub deliverable_id: i64,
    pub kind: AttachmentKind,
    pub original_name: String,
    /// Location of the stored copy
    pub stored_path: String,
    /// Hex SHA-256 of the content
    pub sha256: String,
    pub size_bytes: u64,
    pub description: String,
    pub uploaded_at: String,
}

/// Attachment metadata before it is stored
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub deliverable_id: i64,
    pub kind: AttachmentKind,
    pub original_name: String,
    pub stored_path: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub description: String,
}

/// An event with its suppliers and deliverables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub event: Event,
    pub suppliers: Vec<AssignedSupplier>,
    pub deliverables: Vec<Deliverable>,
}

impl EventDetails {
    /// Sum of the budgets allocated to suppliers
    pub fn total_supplier_budget(&self) -> f64 {
        self.suppliers
            .iter()
            .map(|s| s.assignment.allocated_budget)
            .sum()
    }

    /// Event budget left after supplier allocations; negative when over-allocated
    pub fn remaining_budget(&self) -> f64 {
        self.event.budget - self.total_supplier_budget()
    }

    /// Percentage of assignments marked completed, 0 when there are none
    pub fn completion_rate(&self) -> f64 {
        if self.suppliers.is_empty() {
            return 0.0;
        }
        let completed = self
            .suppliers
            .iter()
            .filter(|s| s.assignment.status == AssignmentStatus::Completed)
            .count();
        completed as f64 / self.suppliers.len() as f64 * 100.0
    }

    /// Deliverables of one supplier, in stored order
    pub fn deliverables_for(&self, supplier_id: i64) -> Vec<&Deliverable> {
        self.deliverables
            .iter()
            .filter(|d| d.supplier_id == supplier_id)
            .collect()
    }

    pub fn total_deliverable_value(&self) -> f64 {
        self.deliverables.iter().map(|d| d.total_value).sum()
    }
}

/// Aggregate figures across events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_events: usize,
    /// Number of assignments across all events
    pub total_suppliers: usize,
    pub total_budget: f64,
    /// Rounded mean of each event's completion rate
    pub average_completion: u32,
}

impl Overview {
    pub fn from_details(events: &[EventDetails]) -> Self {
        let total_events = events.len();
        let total_suppliers = events.iter().map(|e| e.suppliers.len()).sum();
        let total_budget = events.iter().map(|e| e.event.budget).sum();
        let average_completion = if total_events == 0 {
            0
        } else {
            let sum: f64 = events.iter().map(EventDetails::completion_rate).sum();
            (sum / total_events as f64).round() as u32
        };

        Self {
            total_events,
            total_suppliers,
            total_budget,
            average_completion,
        }
    }
}

/// Human readable size: `0 Bytes`, `1.5 KB`, `2 MB`...
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

fn require_text(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn require_amount(field: &'static str, value: f64) -> Result<(), RecordError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RecordError::invalid(
            field,
            format!("{} must be a non-negative amount", value),
        ));
    }
    Ok(())
}

fn require_score(field: &'static str, value: u8) -> Result<(), RecordError> {
    if !(1..=5).contains(&value) {
        return Err(RecordError::invalid(field, format!("{} is outside 1..=5", value)));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), RecordError> {
    let email = email.trim();
    if !EMAIL_PATTERN.is_match(email) {
        return Err(RecordError::invalid("email", format!("'{}' is not an email address", email)));
    }
    Ok(())
}
