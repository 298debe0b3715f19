//! # homebus-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `homebus-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `homebus-app` (for port traits) and `homebus-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod alert_repo;
mod device_repo;
mod error;
mod pool;
mod reading_repo;
mod row;

pub use alert_repo::SqliteAlertRepository;
pub use device_repo::SqliteDeviceRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use reading_repo::SqliteReadingRepository;
