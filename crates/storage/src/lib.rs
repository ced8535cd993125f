//! Database backups as compressed snapshots on a local directory or S3.

pub mod backend;
pub mod error;
pub mod snapshot;
pub mod store;

pub use backend::{LocalBackend, S3Backend, StorageBackend};
pub use error::StorageError;
pub use snapshot::Snapshot;
pub use store::{BackupEntry, BackupInfo, BackupStore};
