use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory {path:?} missing or not usable: {message}")]
    Directory { path: PathBuf, message: String },
    #[error("io error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure `dir` exists and is a directory; create it (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    let directory_error = |message: String| PersistError::Directory {
        path: dir.to_path_buf(),
        message,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(directory_error("path is not a directory".into())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| directory_error(e.to_string()))
        }
        Err(err) => Err(directory_error(err.to_string())),
    }
}

/// Writes `{dir}/{filename}` through a temp file in the same directory and a
/// rename, so readers see either the old content or the new, never a mix.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let io_error = |source: io::Error| PersistError::Io {
            path: target.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        tmp.write_all(content.as_bytes()).map_err(io_error)?;
        tmp.flush().map_err(io_error)?;
        tmp.as_file_mut().sync_all().map_err(io_error)?;
        tmp.persist(&target).map_err(|e| io_error(e.error))?;
        Ok(target)
    }
}
