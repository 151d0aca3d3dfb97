/*!
 * Common test utilities for the eventdesk test suite
 */

use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use eventdesk::Repository;
use eventdesk::database::models::{Event, NewDeliverable, NewEvent, NewSupplier, Supplier};

/// Report text used across formatter tests
pub const SAMPLE_REPORT: &str = "### Event Overview\nThe event \"**Gala**\" is scheduled for **2024-04-01**.";

/// Route library logs to the test output when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn create_event(repository: &Repository, name: &str, budget: f64) -> Event {
    repository
        .create_event(&NewEvent {
            name: name.to_string(),
            date: date(2026, 6, 20),
            location: "Harbour Hall".to_string(),
            status: Default::default(),
            budget,
            description: format!("{} for testing", name),
        })
        .await
        .unwrap()
}

pub async fn create_supplier(repository: &Repository, username: &str) -> Supplier {
    repository
        .create_supplier(&NewSupplier {
            name: format!("{} Ltd", username),
            email: format!("{}@suppliers.example", username),
            phone: "+1 555 0100".to_string(),
            specialization: "Staging".to_string(),
            username: username.to_string(),
            rating: 4,
        })
        .await
        .unwrap()
}

pub fn deliverable(item: &str, quantity: u32, unit_price: f64) -> NewDeliverable {
    NewDeliverable {
        item_name: item.to_string(),
        item_description: String::new(),
        quantity,
        unit_price,
        total_value: None,
        scheduled_delivery_date: Some(date(2026, 6, 18)),
        scheduled_installation_date: Some(date(2026, 6, 19)),
        scheduled_dismantling_date: Some(date(2026, 6, 21)),
    }
}
