/*!
 * Database module for persistent storage of events and suppliers.
 *
 * This module provides SQLite-based persistence for:
 * - Events and their budgets
 * - Suppliers and their assignments to events
 * - Deliverables with milestones, comments and uploaded files
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::Repository;
