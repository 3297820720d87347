//! Core persistence and use-case logic for parcel tracking.
//! This crate owns the `parcel` table and its status-guard invariants.

pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use events::{LogEvents, ParcelNotice, StoreEvents};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::parcel::{now_timestamp, ClientId, NewParcel, Parcel, ParcelNumber, ParcelStatus};
pub use repo::parcel_repo::{
    ChangeOutcome, ParcelRepository, RepoError, RepoResult, SqliteParcelStore,
};
pub use service::parcel_service::ParcelService;
