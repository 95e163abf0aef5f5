//! Whole-file replacement of an audio file with a new tag.
//!
//! A tag lives inside the file it describes, so changing it means writing
//! the whole file again. The original is first renamed to a staging name
//! next to it, the new file is written at the original path, and only then
//! is the staged original deleted. If writing fails, the staged original
//! is renamed back. At every point the original content exists on disk,
//! either at its own path or at the staging path.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{codec, domain::tag::Tag, storage::error::RewriteError};

/// Token that marks a file name as a staging file
pub const STAGING_MARKER: &str = "_TEMP_";

/// Digits in a `%Y%m%d%H%M%S%9f` timestamp
const TIMESTAMP_DIGITS: usize = 23;

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique staging path for `original` in the same directory:
/// `<name>_TEMP_<timestamp>-<seq>.<ext>`
pub fn staging_path(original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S%9f");
    let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    original.with_file_name(format!("{name}{STAGING_MARKER}{timestamp}-{seq}{ext}"))
}

pub fn is_staging_file(path: &Path) -> bool {
    original_for_stage(path).is_some()
}

/// Path of the file a staging file was created from, `None` unless the
/// name ends with a suffix [`staging_path`] generates.
pub fn original_for_stage(stage: &Path) -> Option<PathBuf> {
    let name = stage.file_name()?.to_str()?;
    let (original, suffix) = name.rsplit_once(STAGING_MARKER)?;
    if original.is_empty() {
        return None;
    }

    let is_digit = |c: char| c.is_ascii_digit();
    let (timestamp, rest) = suffix.split_at_checked(TIMESTAMP_DIGITS)?;
    if !timestamp.chars().all(is_digit) {
        return None;
    }
    let rest = rest.strip_prefix('-')?;
    let ext = rest.trim_start_matches(is_digit);
    if ext.len() == rest.len() {
        return None;
    }
    let original_ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    if ext != original_ext {
        return None;
    }
    Some(stage.with_file_name(original))
}

/// An original file that has been moved aside and awaits its replacement.
///
/// Dropping a `StagedFile` without calling [`StagedFile::replace`] leaves
/// the original at the staging path, where [`recover_stage`] finds it.
#[derive(Debug)]
pub struct StagedFile {
    original: PathBuf,
    stage: PathBuf,
}

impl StagedFile {
    pub fn stage(path: &Path) -> Result<Self, RewriteError> {
        let stage = staging_path(path);
        std::fs::rename(path, &stage).map_err(|source| RewriteError::Stage {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("staged {} as {}", path.display(), stage.display());
        Ok(Self {
            original: path.to_path_buf(),
            stage,
        })
    }

    /// Writes `parts` in order as the new file at the original path.
    ///
    /// Returns the staging path if the new file is complete but the stage
    /// could not be deleted.
    pub fn replace(self, parts: &[&[u8]]) -> Result<Option<PathBuf>, RewriteError> {
        self.replace_with(|file| {
            for part in parts {
                file.write_all(part)?;
            }
            Ok(())
        })
    }

    pub(crate) fn replace_with<F>(self, write: F) -> Result<Option<PathBuf>, RewriteError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.original)
            .and_then(|mut file| {
                write(&mut file)?;
                file.sync_all()
            });

        match written {
            Ok(()) => match std::fs::remove_file(&self.stage) {
                Ok(()) => Ok(None),
                Err(e) => {
                    // the replacement is complete; the stage is swept later
                    log::warn!(
                        "could not delete staging file {}: {e}",
                        self.stage.display()
                    );
                    Ok(Some(self.stage))
                }
            },
            Err(source) => self.roll_back(source),
        }
    }

    fn roll_back(self, source: io::Error) -> Result<Option<PathBuf>, RewriteError> {
        match std::fs::remove_file(&self.original) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => log::warn!(
                "could not remove partial file {}: {e}",
                self.original.display()
            ),
            _ => {}
        }
        match std::fs::rename(&self.stage, &self.original) {
            Ok(()) => Err(RewriteError::RolledBack {
                path: self.original,
                source,
            }),
            Err(e) => {
                log::error!(
                    "could not restore {} from {}: {e}",
                    self.original.display(),
                    self.stage.display()
                );
                Err(RewriteError::RollbackFailed {
                    path: self.original,
                    stage: self.stage,
                    source,
                })
            }
        }
    }
}

/// Replaces the file at `path` with `tag` followed by `payload`.
///
/// The tag is encoded before anything on disk is touched. A staging file
/// left behind by the replacement is returned so the caller can sweep it.
pub fn commit(path: &Path, tag: &Tag, payload: &[u8]) -> Result<Option<PathBuf>, RewriteError> {
    let header = codec::encode(tag)?;
    let staged = StagedFile::stage(path)?;
    staged.replace(&[header.as_slice(), payload])
}

/// Puts a staging file back at its original path when that path is free.
///
/// Returns the restored path, or `None` if the original still exists.
pub fn recover_stage(stage: &Path) -> io::Result<Option<PathBuf>> {
    let Some(original) = original_for_stage(stage) else {
        return Ok(None);
    };
    if original.try_exists()? {
        return Ok(None);
    }
    std::fs::rename(stage, &original)?;
    log::warn!(
        "restored {} from interrupted rewrite {}",
        original.display(),
        stage.display()
    );
    Ok(Some(original))
}

/// Deletes a staging file whose original is present. A stage without its
/// original is the only copy of that file and is never deleted.
pub fn sweep_stage(stage: &Path) -> io::Result<bool> {
    let Some(original) = original_for_stage(stage) else {
        return Ok(false);
    };
    if !original.try_exists()? {
        return Ok(false);
    }
    std::fs::remove_file(stage)?;
    log::info!("Deleting file: {}", stage.display());
    Ok(true)
}
