//! CSV store - canonical CSV files, timestamped backups, JSON exports.
//!
//! Layout under the data directory:
//!
//! ```text
//! data/
//! ├── freight.csv
//! ├── vehicle.csv
//! ├── backups/
//! │   ├── freight_backup_20261018_142501.csv
//! │   └── vehicle_backup_20261017_090000.csv
//! └── exports/
//!     └── freight_offers_20261018_142733.json
//! ```
//!
//! Every replacement (upload or restore) first backs up the current file.
//! Only the newest `retention` backups per type are kept. Replacements of
//! the same type are serialized, so concurrent uploads each get their own
//! backup name.

use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{CsvError, StorageError, StorageResult};
use crate::generator::{partition_rows, KNOWN_COLUMNS, REQUIRED_COLUMNS};
use crate::models::{Offer, OfferKind};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto};

static BACKUP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(freight|vehicle)_backup_(\d{8}_\d{6})(_\d+)?\.csv$").expect("static regex")
});

const BACKUP_DIR: &str = "backups";
const EXPORT_DIR: &str = "exports";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Facts about a canonical CSV file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    #[serde(rename = "type")]
    pub csv_type: String,
    pub path: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub usable_rows: usize,
}

/// One backup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub filename: String,
    #[serde(rename = "type")]
    pub csv_type: String,
    pub size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of an upload or restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    #[serde(rename = "type")]
    pub csv_type: String,
    pub path: String,
    /// Backup of the previous file, if there was one.
    pub backup: Option<String>,
    pub row_count: usize,
    pub usable_rows: usize,
    /// Backups deleted by retention.
    pub pruned: Vec<String>,
}

/// On-disk store rooted at a data directory.
///
/// Clones share the replacement locks.
#[derive(Debug, Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
    retention: usize,
    /// One lock per CSV type, held across backup, write and prune.
    replace_locks: Arc<[Mutex<()>; 2]>,
}

impl CsvStore {
    pub fn new(data_dir: impl AsRef<Path>, retention: usize) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            retention: retention.max(1),
            replace_locks: Arc::new([Mutex::new(()), Mutex::new(())]),
        }
    }

    fn replace_lock(&self, kind: OfferKind) -> &Mutex<()> {
        match kind {
            OfferKind::Freight => &self.replace_locks[0],
            OfferKind::VehicleSpace => &self.replace_locks[1],
        }
    }

    /// Path of the canonical CSV for `kind`.
    pub fn csv_path(&self, kind: OfferKind) -> PathBuf {
        self.data_dir.join(format!("{}.csv", kind.csv_type()))
    }

    fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR)
    }

    fn export_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORT_DIR)
    }

    // =========================================================================
    // Info
    // =========================================================================

    pub fn info(&self, kind: OfferKind) -> StorageResult<CsvInfo> {
        let path = self.csv_path(kind);
        let mut info = CsvInfo {
            csv_type: kind.csv_type().to_string(),
            path: path.display().to_string(),
            exists: path.exists(),
            size_bytes: 0,
            modified_at: None,
            encoding: None,
            delimiter: None,
            headers: Vec::new(),
            row_count: 0,
            usable_rows: 0,
        };

        if !info.exists {
            return Ok(info);
        }

        let meta = fs::metadata(&path)?;
        info.size_bytes = meta.len();
        info.modified_at = meta.modified().ok().map(DateTime::<Utc>::from);

        match parse_csv_file_auto(&path) {
            Ok(parsed) => {
                info.row_count = parsed.rows.len();
                info.encoding = Some(parsed.encoding);
                info.delimiter = Some(parsed.delimiter.to_string());
                info.headers = parsed.headers;
                info.usable_rows = partition_rows(parsed.rows).0.len();
            }
            Err(CsvError::EmptyFile) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(info)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Validate `bytes` and make them the canonical CSV for `kind`.
    pub fn upload(&self, kind: OfferKind, bytes: &[u8]) -> StorageResult<ReplaceOutcome> {
        let (row_count, usable_rows) = validate_csv(bytes)?;
        log_success(format!(
            "Upload for {} accepted: {} rows, {} usable",
            kind.csv_type(),
            row_count,
            usable_rows
        ));

        let (path, backup, pruned) = self.replace(kind, bytes)?;
        log_info(format!("💾 Wrote {}", path.display()));

        Ok(ReplaceOutcome {
            csv_type: kind.csv_type().to_string(),
            path: path.display().to_string(),
            backup,
            row_count,
            usable_rows,
            pruned,
        })
    }

    /// Back up the current file, write `bytes` in its place, prune.
    fn replace(&self, kind: OfferKind, bytes: &[u8]) -> StorageResult<(PathBuf, Option<String>, Vec<String>)> {
        let _guard = self.replace_lock(kind).lock();

        let backup = self.backup_current(kind)?;
        fs::create_dir_all(&self.data_dir)?;
        let path = self.csv_path(kind);
        write_atomically(&path, bytes)?;
        let pruned = self.prune(kind)?;

        Ok((path, backup, pruned))
    }

    /// Copy the current canonical file into `backups/`, if it exists.
    fn backup_current(&self, kind: OfferKind) -> StorageResult<Option<String>> {
        let current = self.csv_path(kind);
        if !current.exists() {
            return Ok(None);
        }

        let dir = self.backup_dir();
        fs::create_dir_all(&dir)?;

        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        // same-second backups get an increasing suffix so name order stays age order
        let last = self
            .backups()?
            .iter()
            .filter(|b| b.csv_type == kind.csv_type())
            .filter_map(|b| backup_key(&b.filename))
            .filter(|(s, _)| *s == stamp)
            .map(|(_, n)| n)
            .max();
        let name = match last {
            None => format!("{}_backup_{}.csv", kind.csv_type(), stamp),
            Some(n) => format!("{}_backup_{}_{}.csv", kind.csv_type(), stamp, n + 1),
        };

        fs::copy(&current, dir.join(&name))?;
        log_info(format!("Backed up {} as {}", current.display(), name));
        Ok(Some(name))
    }

    /// Delete the oldest backups of `kind` beyond the retention limit.
    fn prune(&self, kind: OfferKind) -> StorageResult<Vec<String>> {
        let mut own: Vec<BackupEntry> = self
            .backups()?
            .into_iter()
            .filter(|b| b.csv_type == kind.csv_type())
            .collect();

        if own.len() <= self.retention {
            return Ok(Vec::new());
        }

        // oldest first
        own.sort_by_key(|b| backup_key(&b.filename));
        let excess = own.len() - self.retention;
        let mut pruned = Vec::with_capacity(excess);

        for entry in own.into_iter().take(excess) {
            fs::remove_file(self.backup_dir().join(&entry.filename))?;
            pruned.push(entry.filename);
        }

        log_info(format!("Pruned {} old backup(s)", pruned.len()));
        Ok(pruned)
    }

    // =========================================================================
    // Backups & restore
    // =========================================================================

    /// All backups, newest first.
    pub fn backups(&self) -> StorageResult<Vec<BackupEntry>> {
        let dir = self.backup_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)?.flatten() {
            let filename = entry.file_name().to_string_lossy().to_string();
            let Some(caps) = BACKUP_NAME.captures(&filename) else {
                continue;
            };
            let meta = entry.metadata()?;
            entries.push(BackupEntry {
                csv_type: caps[1].to_string(),
                size_bytes: meta.len(),
                created_at: meta.modified().ok().map(DateTime::<Utc>::from),
                filename,
            });
        }

        entries.sort_by_key(|b| std::cmp::Reverse(backup_key(&b.filename)));
        Ok(entries)
    }

    /// Make the named backup the canonical CSV again.
    pub fn restore(&self, filename: &str) -> StorageResult<ReplaceOutcome> {
        let caps = BACKUP_NAME
            .captures(filename)
            .ok_or_else(|| StorageError::InvalidBackupName(filename.to_string()))?;
        let kind = OfferKind::from_csv_type(&caps[1])
            .ok_or_else(|| StorageError::InvalidBackupName(filename.to_string()))?;

        let source = self.backup_dir().join(filename);
        if !source.is_file() {
            return Err(StorageError::BackupNotFound(filename.to_string()));
        }

        let bytes = fs::read(&source)?;
        let (row_count, usable_rows) = validate_csv(&bytes)?;

        let (path, backup, pruned) = self.replace(kind, &bytes)?;
        log_success(format!("♻️  Restored {} from {}", path.display(), filename));

        Ok(ReplaceOutcome {
            csv_type: kind.csv_type().to_string(),
            path: path.display().to_string(),
            backup,
            row_count,
            usable_rows,
            pruned,
        })
    }

    // =========================================================================
    // Exports
    // =========================================================================

    /// Write generated offers to `exports/<kind>_offers_<stamp>.json`.
    pub fn export_offers(&self, kind: OfferKind, offers: &[Offer]) -> StorageResult<PathBuf> {
        let dir = self.export_dir();
        fs::create_dir_all(&dir)?;

        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        let prefix = kind.generate_segment().replace('-', "_");
        let json = serde_json::to_string_pretty(offers)?;

        // create_new claims the name atomically
        let mut n = 0;
        let (path, mut file) = loop {
            let name = match n {
                0 => format!("{}_offers_{}.json", prefix, stamp),
                n => format!("{}_offers_{}_{}.json", prefix, stamp, n),
            };
            let path = dir.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(json.as_bytes())?;
        log_info(format!("💾 Exported {} offers to {}", offers.len(), path.display()));
        Ok(path)
    }
}

/// Age ordering key of a backup name: `(stamp, same-second sequence)`.
fn backup_key(filename: &str) -> Option<(String, u32)> {
    let caps = BACKUP_NAME.captures(filename)?;
    let seq = caps
        .get(3)
        .and_then(|m| m.as_str().trim_start_matches('_').parse().ok())
        .unwrap_or(0);
    Some((caps[2].to_string(), seq))
}

/// Parse and check mandatory columns; returns `(rows, usable rows)`.
fn validate_csv(bytes: &[u8]) -> StorageResult<(usize, usize)> {
    let parsed = parse_bytes_auto(bytes)?;

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !parsed.headers.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns(missing).into());
    }

    let unknown: Vec<&str> = parsed
        .headers
        .iter()
        .map(String::as_str)
        .filter(|h| !KNOWN_COLUMNS.contains(h))
        .collect();
    if !unknown.is_empty() {
        log_warning("Some columns are not used by the generator:");
        log_info_indent(unknown.join(", "), 1);
    }

    let row_count = parsed.rows.len();
    let (usable, skipped) = partition_rows(parsed.rows);
    if usable.is_empty() {
        return Err(CsvError::NoUsableRows(skipped.len()).into());
    }
    if !skipped.is_empty() {
        log_warning(format!("{} rows lack usable mandatory values and will be ignored", skipped.len()));
    }

    Ok((row_count, usable.len()))
}

/// Write to a uniquely named sibling temp file, then rename over the target.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const GOOD: &str = "customer_id,contact_first_name,description\n1,Ann,Boxes\n2,Bob,Crates\n";
    const OTHER: &str = "customer_id;contact_first_name;description\n9;Zoe;Tiles\n";

    #[test]
    fn test_info_missing_file() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let info = store.info(OfferKind::Freight).unwrap();
        assert!(!info.exists);
        assert_eq!(info.row_count, 0);
        assert!(info.path.ends_with("freight.csv"));
    }

    #[test]
    fn test_upload_then_info() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let outcome = store.upload(OfferKind::VehicleSpace, GOOD.as_bytes()).unwrap();
        assert!(outcome.backup.is_none());
        assert_eq!(outcome.usable_rows, 2);

        let info = store.info(OfferKind::VehicleSpace).unwrap();
        assert!(info.exists);
        assert_eq!(info.csv_type, "vehicle");
        assert_eq!(info.row_count, 2);
        assert_eq!(info.headers, vec!["customer_id", "contact_first_name", "description"]);
    }

    #[test]
    fn test_upload_backs_up_previous() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        store.upload(OfferKind::Freight, GOOD.as_bytes()).unwrap();
        let outcome = store.upload(OfferKind::Freight, OTHER.as_bytes()).unwrap();

        let backup = outcome.backup.unwrap();
        assert!(BACKUP_NAME.is_match(&backup));
        let saved = fs::read_to_string(dir.path().join("backups").join(&backup)).unwrap();
        assert_eq!(saved, GOOD);
        assert_eq!(fs::read_to_string(store.csv_path(OfferKind::Freight)).unwrap(), OTHER);

        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].csv_type, "freight");
    }

    #[test]
    fn test_upload_rejects_missing_columns() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let err = store.upload(OfferKind::Freight, b"customer_id,name\n1,Ann\n").unwrap_err();
        assert!(matches!(err, StorageError::Csv(CsvError::MissingColumns(_))));
        assert!(!store.csv_path(OfferKind::Freight).exists());
    }

    #[test]
    fn test_upload_rejects_no_usable_rows() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let err = store
            .upload(OfferKind::Freight, b"customer_id,contact_first_name,description\n1,,x\n")
            .unwrap_err();
        assert!(matches!(err, StorageError::Csv(CsvError::NoUsableRows(1))));
    }

    #[test]
    fn test_upload_counts_bad_customer_ids_as_unusable() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let err = store
            .upload(OfferKind::Freight, b"customer_id,contact_first_name,description\nCUST-7,Ann,Boxes\n")
            .unwrap_err();
        assert!(matches!(err, StorageError::Csv(CsvError::NoUsableRows(1))));
        assert!(!store.csv_path(OfferKind::Freight).exists());

        let outcome = store
            .upload(
                OfferKind::Freight,
                b"customer_id,contact_first_name,description\nCUST-7,Ann,Boxes\n7,Bob,Crates\n",
            )
            .unwrap();
        assert_eq!(outcome.row_count, 2);
        assert_eq!(outcome.usable_rows, 1);
        assert_eq!(store.info(OfferKind::Freight).unwrap().usable_rows, 1);
    }

    #[test]
    fn test_retention_prunes_oldest() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 2);

        for _ in 0..5 {
            store.upload(OfferKind::Freight, GOOD.as_bytes()).unwrap();
        }

        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 2);
    }

    #[test]
    fn test_concurrent_uploads_keep_every_backup() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10_000);
        let errors = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..25 {
                        if store.upload(OfferKind::Freight, GOOD.as_bytes()).is_err() {
                            errors.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(errors.load(Ordering::SeqCst), 0);
        // every upload but the first replaced a file
        assert_eq!(store.backups().unwrap().len(), 99);

        // no temp files left next to the canonical CSV
        let files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["freight.csv"]);
    }

    #[test]
    fn test_concurrent_exports_get_distinct_files() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let paths: Vec<PathBuf> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.export_offers(OfferKind::Freight, &[]).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut unique = paths.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_backup_key_orders_by_age() {
        let mut names = vec![
            "freight_backup_20261018_120000_10.csv",
            "freight_backup_20261018_120000_2.csv",
            "freight_backup_20261018_120000.csv",
            "freight_backup_20261017_235959.csv",
        ];
        names.sort_by_key(|n| backup_key(n));
        assert_eq!(
            names,
            vec![
                "freight_backup_20261017_235959.csv",
                "freight_backup_20261018_120000.csv",
                "freight_backup_20261018_120000_2.csv",
                "freight_backup_20261018_120000_10.csv",
            ]
        );
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        store.upload(OfferKind::Freight, GOOD.as_bytes()).unwrap();
        let backup = store
            .upload(OfferKind::Freight, OTHER.as_bytes())
            .unwrap()
            .backup
            .unwrap();

        let outcome = store.restore(&backup).unwrap();
        assert_eq!(outcome.usable_rows, 2);
        assert!(outcome.backup.is_some());
        assert_eq!(fs::read_to_string(store.csv_path(OfferKind::Freight)).unwrap(), GOOD);
    }

    #[test]
    fn test_restore_rejects_bad_names() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        for name in ["../freight.csv", "freight.csv", "freight_backup_2026.csv", "x_backup_20261018_120000.csv"] {
            assert!(matches!(store.restore(name), Err(StorageError::InvalidBackupName(_))), "{}", name);
        }
        assert!(matches!(
            store.restore("vehicle_backup_20261018_120000.csv"),
            Err(StorageError::BackupNotFound(_))
        ));
    }

    #[test]
    fn test_export_offers() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path(), 10);

        let path = store.export_offers(OfferKind::VehicleSpace, &[]).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("vehicle_space_offers_"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
