use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use doors_logging::doors_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn dir_error(dir: &Path, reason: impl ToString) -> PersistError {
    PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Creates `dir` when missing and checks a file can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(dir_error(dir, "not a directory")),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| dir_error(dir, e))?;
        }
        Err(err) => return Err(dir_error(dir, err)),
    }
    NamedTempFile::new_in(dir).map_err(|e| dir_error(dir, format!("not writable ({e})")))?;
    Ok(())
}

/// Exports land under their final name only once fully written: the body
/// goes to a temp file in the same directory, which is then renamed over
/// any previous export of that name.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        self.write_with(filename, |out| out.write_all(content).map_err(PersistError::from))
    }

    /// Streams the body through `fill`. Nothing appears under `filename`
    /// when `fill` fails.
    pub fn write_with<E, F>(&self, filename: &str, fill: F) -> Result<PathBuf, E>
    where
        E: From<PersistError>,
        F: FnOnce(&mut dyn Write) -> Result<(), E>,
    {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(PersistError::from)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            fill(&mut out)?;
            out.flush().map_err(PersistError::from)?;
        }
        tmp.as_file_mut().sync_all().map_err(PersistError::from)?;

        if target.exists() {
            fs::remove_file(&target).map_err(PersistError::from)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        doors_debug!("wrote {}", target.display());
        Ok(target)
    }
}
