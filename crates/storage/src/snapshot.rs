//! Snapshot payload and its on-disk encoding (zstd-compressed JSON).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;

pub const FORMAT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

const NAME_PREFIX: &str = "backup-";
const NAME_SUFFIX: &str = ".json.zst";
const NAME_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Every table's rows at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, Vec<serde_json::Value>>,
}

impl Snapshot {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at,
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<serde_json::Value>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    /// Row count per table.
    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect()
    }
}

pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, StorageError> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?)
}

pub fn decode(bytes: &[u8]) -> Result<Snapshot, StorageError> {
    let json = zstd::decode_all(bytes)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Lower-case hex SHA-256.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `backup-20260115-020000.json.zst`
pub fn backup_name(at: DateTime<Utc>) -> String {
    format!("{NAME_PREFIX}{}{NAME_SUFFIX}", at.format(NAME_TIME_FORMAT))
}

/// Timestamp encoded in a backup name, or `None` for foreign objects.
pub fn parse_backup_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(NAME_PREFIX)?.strip_suffix(NAME_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, NAME_TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_round_trip_and_reject_strangers() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 2, 0, 9).unwrap();
        let name = backup_name(at);
        assert_eq!(name, "backup-20260115-020009.json.zst");
        assert_eq!(parse_backup_name(&name), Some(at));

        assert_eq!(parse_backup_name("backup-20260115-020009.json.zst.sha256"), None);
        assert_eq!(parse_backup_name("../etc/passwd"), None);
        assert_eq!(parse_backup_name("backup-2026-01-15.json.zst"), None);
    }

    #[test]
    fn encoded_snapshot_is_compressed_json() {
        let rows: Vec<_> = (0..200)
            .map(|i| serde_json::json!({"id": i, "title": "same title every row"}))
            .collect();
        let snapshot = Snapshot::new(Utc::now()).with_table("work_items", rows);
        let bytes = encode(&snapshot).unwrap();
        let plain = serde_json::to_vec(&snapshot).unwrap();
        assert!(bytes.len() < plain.len() / 4);
        assert_eq!(decode(&bytes).unwrap(), snapshot);
        assert_eq!(snapshot.row_counts()["work_items"], 200);
    }

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
