//! Backup manager: timestamped copies of sensitive system files taken before
//! a run, and discovery of those copies for manual restore.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackupError;
use crate::tasks::{Context, ExecutionMode};

/// Suffix format appended to every backup copy.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Backup root relative to the user's home directory.
const DEFAULT_ROOT: &str = ".config/base-linux-setup/backups";

/// System-wide files snapshotted before a run.
const SYSTEM_SOURCES: &[&str] = &["/etc/fstab", "/boot/config.txt", "/etc/modules"];

/// Per-user files (relative to `$HOME`) snapshotted before a run.
const USER_SOURCES: &[&str] = &[".bashrc", ".profile"];

/// A backup copy found under the backup root.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BackupRecord {
    /// Full path of the copy.
    pub path: PathBuf,
    /// File name of the copy (`<original>.<timestamp>`).
    pub file_name: String,
    /// Basename of the file that was copied.
    pub original: String,
    /// Timestamp suffix, when the name carries one.
    pub timestamp: Option<String>,
}

impl BackupRecord {
    /// Build a record from a path under the backup root.
    ///
    /// Returns `None` if the path has no UTF-8 file name.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let (original, timestamp) = match file_name.rsplit_once('.') {
            Some((original, suffix)) if is_timestamp(suffix) => {
                (original.to_string(), Some(suffix.to_string()))
            }
            _ => (file_name.clone(), None),
        };
        Some(Self {
            path,
            file_name,
            original,
            timestamp,
        })
    }
}

/// `YYYYMMDD-HHMMSS`
fn is_timestamp(s: &str) -> bool {
    s.split_once('-').is_some_and(|(date, time)| {
        date.len() == 8
            && time.len() == 6
            && date.bytes().all(|b| b.is_ascii_digit())
            && time.bytes().all(|b| b.is_ascii_digit())
    })
}

/// What a [`BackupManager::create_backup`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Timestamp shared by every copy of this call.
    pub timestamp: String,
    /// Copies made (empty in dry-run mode).
    pub copied: Vec<BackupRecord>,
    /// Sources that did not exist and were skipped.
    pub missing: Vec<PathBuf>,
    /// Sources that would have been copied in dry-run mode.
    pub planned: Vec<PathBuf>,
    /// Non-fatal problems (failed copy, checksum mismatch).
    pub warnings: Vec<String>,
}

/// Snapshots a fixed list of files into a backup root.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    sources: Vec<PathBuf>,
}

impl BackupManager {
    /// Manager for the standard source list, rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf, home: &Path) -> Self {
        let sources = SYSTEM_SOURCES
            .iter()
            .map(PathBuf::from)
            .chain(USER_SOURCES.iter().map(|f| home.join(f)))
            .collect();
        Self { root, sources }
    }

    /// Manager for an explicit source list.
    #[must_use]
    pub const fn with_sources(root: PathBuf, sources: Vec<PathBuf>) -> Self {
        Self { root, sources }
    }

    /// Default backup root for `home`.
    #[must_use]
    pub fn default_root(home: &Path) -> PathBuf {
        home.join(DEFAULT_ROOT)
    }

    /// Backup root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files this manager snapshots.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Copy every existing source into the backup root under the current
    /// local timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::CreateRoot`] if the backup root cannot be
    /// created. Individual copy failures are warnings.
    pub fn create_backup(
        &self,
        ctx: &Context,
        mode: ExecutionMode,
    ) -> Result<BackupReport, BackupError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.create_backup_at(ctx, mode, &timestamp)
    }

    /// Same as [`create_backup`](Self::create_backup) with a caller-chosen
    /// timestamp suffix.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::CreateRoot`] if the backup root cannot be
    /// created.
    pub fn create_backup_at(
        &self,
        ctx: &Context,
        mode: ExecutionMode,
        timestamp: &str,
    ) -> Result<BackupReport, BackupError> {
        let mut report = BackupReport {
            timestamp: timestamp.to_string(),
            ..BackupReport::default()
        };

        if mode.is_dry_run() {
            ctx.log
                .dry_run(&format!("Would create backup directory {}", self.root.display()));
        } else {
            fs::create_dir_all(&self.root).map_err(|source| BackupError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;
        }

        for source in &self.sources {
            if !source.exists() {
                ctx.log
                    .debug(&format!("skip backup: {} (not found)", source.display()));
                report.missing.push(source.clone());
                continue;
            }
            let Some(name) = source.file_name() else {
                continue;
            };
            let mut copy_name = name.to_os_string();
            copy_name.push(format!(".{timestamp}"));
            let dest = self.root.join(copy_name);

            if mode.is_dry_run() {
                ctx.log.dry_run(&format!(
                    "Would back up {} to {}",
                    source.display(),
                    dest.display()
                ));
                report.planned.push(source.clone());
                continue;
            }

            match copy_and_verify(ctx, source, &dest) {
                Ok(()) => {
                    ctx.log.info(&format!("Backed up: {}", source.display()));
                    report.copied.extend(BackupRecord::from_path(dest));
                }
                Err(warning) => {
                    ctx.log.warn(&warning);
                    report.warnings.push(warning);
                }
            }
        }

        if !mode.is_dry_run() {
            ctx.log.info(&format!(
                "Backup complete: {} file(s) in {}",
                report.copied.len(),
                self.root.display()
            ));
        }
        Ok(report)
    }

    /// Log and return every backup whose file name contains `pattern`.
    ///
    /// Discovery only: nothing is copied back.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::ReadRoot`] if the backup root cannot be listed.
    pub fn restore_backup(
        &self,
        ctx: &Context,
        pattern: &str,
    ) -> Result<Vec<BackupRecord>, BackupError> {
        let matches: Vec<BackupRecord> = self
            .list_backups()?
            .into_iter()
            .filter(|r| r.file_name.contains(pattern))
            .collect();
        if matches.is_empty() {
            ctx.log.warn(&format!("No backups matching '{pattern}'"));
        }
        for record in &matches {
            ctx.log
                .info(&format!("Found backup: {}", record.path.display()));
        }
        Ok(matches)
    }

    /// Every backup under the root, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::ReadRoot`] if the backup root cannot be listed.
    pub fn list_backups(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let read_err = |source: std::io::Error| BackupError::ReadRoot {
            path: self.root.clone(),
            source,
        };
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            if entry.path().is_file() {
                records.extend(BackupRecord::from_path(entry.path()));
            }
        }
        records.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(records)
    }
}

/// Copy with `cp`, then compare digests. Errors are warning text.
fn copy_and_verify(ctx: &Context, source: &Path, dest: &Path) -> Result<(), String> {
    let src = source.to_string_lossy();
    let dst = dest.to_string_lossy();
    ctx.executor
        .run("cp", &[&*src, &*dst])
        .map_err(|e| format!("Failed to back up {src}: {e:#}"))?;

    match (compute_sha256(source), compute_sha256(dest)) {
        (Ok(a), Ok(b)) if a == b => {
            ctx.log.debug(&format!("checksum ok: {dst} ({a})"));
            Ok(())
        }
        (Ok(_), Ok(_)) => Err(format!("Checksum mismatch for backup of {src}")),
        (Err(e), _) | (_, Err(e)) => Err(format!("Could not verify backup of {src}: {e}")),
    }
}

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> std::io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    let mut hex = String::with_capacity(64);
    for b in &digest {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}
