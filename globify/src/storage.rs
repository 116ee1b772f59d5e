use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::document::{Document, DocumentError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse JSON from '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode JSON for '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid document in '{}': {source}", .path.display())]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

/// Where locale documents are read from and written to.
pub trait Storage: Send + Sync {
    fn read(&self, path: &Path) -> Result<Document, StorageError>;

    /// Writes `document`, creating missing parent directories.
    fn write(&self, path: &Path, document: &Document) -> Result<(), StorageError>;

    fn exists(&self, path: &Path) -> Result<bool, StorageError>;
}

/// Path of the document for `locale`, e.g. `locales/fr.json`.
pub fn locale_file_path(folder: &Path, locale: &str, extension: &str) -> PathBuf {
    folder.join(format!("{}.{}", locale, extension))
}

/// Stores documents as pretty-printed JSON files.
///
/// The file layout is a single JSON object per locale:
/// ```json
/// {
///     "@metadata": { ... },
///     "greeting": "Hello, {name}!",
///     "nav": { "home": "Home" }
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStorage;

impl JsonStorage {
    pub fn new() -> Self {
        JsonStorage
    }
}

impl Storage for JsonStorage {
    fn read(&self, path: &Path) -> Result<Document, StorageError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_path_buf())
            } else {
                StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| StorageError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        let document =
            Document::from_value(value).map_err(|source| StorageError::InvalidDocument {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            "Read {} entries from '{}'",
            document.len(),
            path.display()
        );
        Ok(document)
    }

    fn write(&self, path: &Path, document: &Document) -> Result<(), StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut content =
            serde_json::to_string_pretty(document).map_err(|source| StorageError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        content.push('\n');

        fs::write(path, content).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote {} entries to '{}'", document.len(), path.display());
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
