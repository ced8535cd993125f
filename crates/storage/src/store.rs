//! [`BackupStore`]: write, list, verify and prune snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::PutPayload;
use serde::Serialize;
use tracing::{info, warn};

use bow_core::config::BackupConfig;

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::snapshot::{self, backup_name, parse_backup_name, Snapshot};

const CHECKSUM_SUFFIX: &str = ".sha256";

/// Result of writing one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// SHA-256 of the compressed object.
    pub checksum: String,
    pub row_counts: BTreeMap<String, usize>,
}

/// A stored snapshot as seen by [`BackupStore::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

pub struct BackupStore {
    backend: StorageBackend,
}

impl BackupStore {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &BackupConfig) -> Result<Self, StorageError> {
        Ok(Self::new(StorageBackend::from_config(config)?))
    }

    pub fn location(&self) -> String {
        self.backend.describe()
    }

    fn path(&self, name: &str) -> ObjectPath {
        match self.backend.prefix() {
            "" => ObjectPath::from(name),
            prefix => ObjectPath::from(format!("{prefix}/{name}")),
        }
    }

    fn list_prefix(&self) -> Option<ObjectPath> {
        match self.backend.prefix() {
            "" => None,
            prefix => Some(ObjectPath::from(prefix)),
        }
    }

    /// Compress and store `snapshot` under a name derived from its
    /// timestamp, with a `.sha256` sidecar holding the checksum.
    pub async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<BackupInfo, StorageError> {
        let bytes = snapshot::encode(snapshot)?;
        let checksum = snapshot::checksum(&bytes);
        let name = backup_name(snapshot.created_at);
        let size_bytes = bytes.len() as u64;

        let store = self.backend.store();
        store
            .put(&self.path(&name), PutPayload::from(bytes))
            .await?;
        store
            .put(
                &self.path(&format!("{name}{CHECKSUM_SUFFIX}")),
                PutPayload::from(checksum.clone().into_bytes()),
            )
            .await?;

        info!(backup = %name, size_bytes, checksum = %checksum, "backup written");
        Ok(BackupInfo {
            name,
            created_at: snapshot.created_at,
            size_bytes,
            checksum,
            row_counts: snapshot.row_counts(),
        })
    }

    /// Stored snapshots, newest first. Objects that are not backups are
    /// ignored.
    pub async fn list(&self) -> Result<Vec<BackupEntry>, StorageError> {
        let prefix = self.list_prefix();
        let mut stream = self.backend.store().list(prefix.as_ref());
        let mut entries = Vec::new();

        while let Some(meta) = stream.try_next().await? {
            let Some(name) = meta.location.filename() else {
                continue;
            };
            if let Some(created_at) = parse_backup_name(name) {
                entries.push(BackupEntry {
                    name: name.to_string(),
                    created_at,
                    size_bytes: meta.size as u64,
                });
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Fetch, verify against the sidecar checksum and decode a snapshot.
    pub async fn read_snapshot(&self, name: &str) -> Result<Snapshot, StorageError> {
        if parse_backup_name(name).is_none() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        let store = self.backend.store();

        let bytes = match store.get(&self.path(name)).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let actual = snapshot::checksum(&bytes);
        match store.get(&self.path(&format!("{name}{CHECKSUM_SUFFIX}"))).await {
            Ok(result) => {
                let sidecar = result.bytes().await?;
                let expected = String::from_utf8_lossy(&sidecar).trim().to_string();
                if expected != actual {
                    return Err(StorageError::Checksum {
                        name: name.to_string(),
                        expected,
                        actual,
                    });
                }
            }
            Err(object_store::Error::NotFound { .. }) => {
                warn!(backup = %name, "no checksum sidecar, skipping verification");
            }
            Err(e) => return Err(e.into()),
        }

        snapshot::decode(&bytes)
    }

    /// Delete snapshots older than `keep_days`, always keeping the newest
    /// `keep_min`. Returns the deleted names.
    pub async fn prune(
        &self,
        now: DateTime<Utc>,
        keep_days: u32,
        keep_min: usize,
    ) -> Result<Vec<String>, StorageError> {
        let cutoff = now - Duration::days(i64::from(keep_days));
        let store = self.backend.store();
        let mut deleted = Vec::new();

        for entry in self.list().await?.into_iter().skip(keep_min) {
            if entry.created_at >= cutoff {
                continue;
            }
            store.delete(&self.path(&entry.name)).await?;
            let sidecar = self.path(&format!("{}{CHECKSUM_SUFFIX}", entry.name));
            match store.delete(&sidecar).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
            deleted.push(entry.name);
        }

        if !deleted.is_empty() {
            info!(count = deleted.len(), keep_days, keep_min, "pruned old backups");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use chrono::TimeZone;

    fn local_store(dir: &std::path::Path) -> BackupStore {
        BackupStore::new(StorageBackend::Local(LocalBackend::new(dir).unwrap()))
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn snapshot(created_at: DateTime<Utc>) -> Snapshot {
        Snapshot::new(created_at).with_table(
            "risks",
            vec![serde_json::json!({"id": 1, "title": "Flood", "likelihood": 3})],
        )
    }

    #[tokio::test]
    async fn write_then_read_verifies_checksum() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());

        let snap = snapshot(at(15, 2));
        let info = store.write_snapshot(&snap).await.unwrap();
        assert_eq!(info.name, "backup-20260115-020000.json.zst");
        assert_eq!(info.checksum.len(), 64);
        assert_eq!(info.row_counts["risks"], 1);
        assert!(tmp.path().join(&info.name).is_file());

        let back = store.read_snapshot(&info.name).await.unwrap();
        assert_eq!(back, snap);
    }

    #[tokio::test]
    async fn tampered_backup_fails_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        let info = store.write_snapshot(&snapshot(at(15, 2))).await.unwrap();

        std::fs::write(tmp.path().join(format!("{}.sha256", info.name)), "0".repeat(64)).unwrap();
        let err = store.read_snapshot(&info.name).await.unwrap_err();
        assert!(matches!(err, StorageError::Checksum { .. }));
    }

    #[tokio::test]
    async fn read_rejects_bad_and_missing_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        assert!(matches!(
            store.read_snapshot("../secret").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            store.read_snapshot("backup-20200101-000000.json.zst").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_skips_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        for day in [3, 10, 7] {
            store.write_snapshot(&snapshot(at(day, 2))).await.unwrap();
        }
        std::fs::write(tmp.path().join("notes.txt"), "hello").unwrap();

        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                "backup-20260110-020000.json.zst",
                "backup-20260107-020000.json.zst",
                "backup-20260103-020000.json.zst",
            ]
        );
    }

    #[tokio::test]
    async fn prune_respects_age_and_minimum() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        for day in [1, 2, 3, 20] {
            store.write_snapshot(&snapshot(at(day, 2))).await.unwrap();
        }
        let now = at(25, 12);

        // keep_days 10: days 1..3 are old, but the newest two always stay
        let deleted = store.prune(now, 10, 2).await.unwrap();
        assert_eq!(
            deleted,
            vec!["backup-20260102-020000.json.zst", "backup-20260101-020000.json.zst"]
        );
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert!(!tmp.path().join("backup-20260101-020000.json.zst.sha256").exists());

        // nothing left to prune
        assert!(store.prune(now, 10, 2).await.unwrap().is_empty());
    }
}
