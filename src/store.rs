//! JSON persistence for the corpus, word list, per-letter checkpoints and chat sessions.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not replace {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: tempfile::PersistError,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Read a JSON document into `T`.
///
/// Map keys are JSON strings; when `T` uses integer keys (session ids) serde_json
/// parses `"123"` into `123`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        StoreError::Parse {
            path: path.display().to_string(),
            source,
        }
    })?;
    debug!(path = %path.display(), "loaded");
    Ok(value)
}

/// Write `value` as pretty JSON, replacing `path` only once the write succeeded.
pub fn save<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        writer.flush().map_err(|e| StoreError::io(path, e))?;
    }
    tmp.persist(path).map_err(|source| StoreError::Persist {
        path: path.display().to_string(),
        source,
    })?;

    debug!(path = %path.display(), "saved");
    Ok(())
}
