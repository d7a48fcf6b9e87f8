//! Timestamped snapshot archive.
//!
//! Layout under the archive root:
//!
//! ```text
//! {root}/
//! ├── 20240101-080000/
//! │   ├── content.txt     # normalized text
//! │   └── content.html    # markup of the selected element
//! └── 20240102-093015/
//!     └── ...
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use watch_core::VersionId;
use watch_logging::{watch_info, watch_warn};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::Clock;

pub const TEXT_FILENAME: &str = "content.txt";
pub const MARKUP_FILENAME: &str = "content.html";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to write version {id}: {source}")]
    Write {
        id: VersionId,
        #[source]
        source: PersistError,
    },
    #[error("failed to list versions in {path:?}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PruneReport {
    pub kept: Vec<VersionId>,
    pub removed: Vec<VersionId>,
    /// Versions whose removal failed; they are retried on the next prune.
    pub failed: Vec<VersionId>,
}

pub struct VersionArchive {
    root: PathBuf,
    clock: Clock,
    remove_dir: fn(&Path) -> io::Result<()>,
}

impl VersionArchive {
    pub fn new(root: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            root: root.into(),
            clock,
            remove_dir: remove_version_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, id: &VersionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Writes a new snapshot named after the current UTC second. A second save
    /// within the same second overwrites the first.
    pub fn save(&self, text: &str, markup: &str) -> Result<VersionId, ArchiveError> {
        let id = VersionId::from_datetime(&(self.clock)());
        let writer = AtomicFileWriter::new(self.version_dir(&id));
        let write = |filename: &str, content: &str| {
            writer
                .write(filename, content)
                .map_err(|source| ArchiveError::Write {
                    id: id.clone(),
                    source,
                })
        };
        write(TEXT_FILENAME, text)?;
        write(MARKUP_FILENAME, markup)?;
        Ok(id)
    }

    /// All archived version ids, newest first.
    pub fn list(&self) -> Result<Vec<VersionId>, ArchiveError> {
        let list_error = |source| ArchiveError::List {
            path: self.root.clone(),
            source,
        };
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(list_error(err)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(list_error)?;
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                ids.push(VersionId::new(entry.file_name().to_string_lossy()));
            }
        }
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Keeps the `keep` newest versions and deletes the rest. `keep == 0`
    /// deletes every version. One failed deletion does not stop the others.
    pub fn prune(&self, keep: usize) -> Result<PruneReport, ArchiveError> {
        let mut versions = self.list()?;
        let stale = versions.split_off(keep.min(versions.len()));
        let mut report = PruneReport {
            kept: versions,
            ..PruneReport::default()
        };

        for id in stale {
            match (self.remove_dir)(&self.version_dir(&id)) {
                Ok(()) => {
                    watch_info!("Removed old version {}", id);
                    report.removed.push(id);
                }
                Err(err) => {
                    watch_warn!("Could not remove version {}: {}", id, err);
                    report.failed.push(id);
                }
            }
        }
        Ok(report)
    }
}

/// Two-phase delete: every file first, then the emptied directories deepest
/// first, then `dir` itself. Continues past failures and returns the first.
fn remove_version_dir(dir: &Path) -> io::Result<()> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    collect_tree(dir, &mut files, &mut dirs)?;

    let mut first_error: Option<io::Error> = None;
    for file in files {
        if let Err(err) = fs::remove_file(&file) {
            if err.kind() != io::ErrorKind::NotFound {
                first_error.get_or_insert(err);
            }
        }
    }

    dirs.push(dir.to_path_buf());
    dirs.sort_by_key(|path| std::cmp::Reverse(path.components().count()));
    for sub in dirs {
        if let Err(err) = fs::remove_dir(&sub) {
            if err.kind() != io::ErrorKind::NotFound {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn collect_tree(dir: &Path, files: &mut Vec<PathBuf>, dirs: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            dirs.push(path.clone());
            collect_tree(&path, files, dirs)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
