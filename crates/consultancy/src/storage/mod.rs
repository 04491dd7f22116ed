//! Uploaded file storage: student profile images and supporting documents.

mod router;

pub use router::upload_router;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mime::Mime;
use tracing::debug;

/// Upload category; each maps to its own directory under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    ProfileImage,
    Document,
}

impl UploadKind {
    pub const fn dir_name(self) -> &'static str {
        match self {
            UploadKind::ProfileImage => "profile-images",
            UploadKind::Document => "documents",
        }
    }

    /// Resolves the path segment used under `/uploads/`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "profile-images" => Some(UploadKind::ProfileImage),
            "documents" => Some(UploadKind::Document),
            _ => None,
        }
    }

    /// Public path a stored file is served from.
    pub fn public_path(self, name: &str) -> String {
        format!("/uploads/{}/{name}", self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid file name '{0}'")]
    InvalidName(String),
    #[error("file storage io failure: {0}")]
    Io(#[from] io::Error),
}

/// Blob storage port used by the upload handlers.
pub trait FileStore: Send + Sync {
    /// Stores `bytes` as `<stem><ext>`, taking `ext` from `original_name`.
    fn save(
        &self,
        kind: UploadKind,
        stem: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError>;
    /// Removing a file that is already gone is not an error.
    fn remove(&self, kind: UploadKind, name: &str) -> Result<(), StorageError>;
    /// File contents and guessed content type, if the file exists.
    fn open(&self, kind: UploadKind, name: &str)
        -> Result<Option<(Vec<u8>, Mime)>, StorageError>;
}

/// Stores uploads as plain files below `root`.
#[derive(Debug, Clone)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, kind: UploadKind, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(kind.dir_name()).join(name))
    }
}

impl FileStore for DiskFileStore {
    fn save(
        &self,
        kind: UploadKind,
        stem: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let name = format!("{stem}{}", extension_of(original_name));
        let path = self.resolve(kind, &name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!(kind = kind.dir_name(), file = %name, size = bytes.len(), "upload stored");
        Ok(StoredFile { name, path })
    }

    fn remove(&self, kind: UploadKind, name: &str) -> Result<(), StorageError> {
        let path = self.resolve(kind, name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(kind = kind.dir_name(), file = %name, "upload removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn open(
        &self,
        kind: UploadKind,
        name: &str,
    ) -> Result<Option<(Vec<u8>, Mime)>, StorageError> {
        let path = self.resolve(kind, name)?;
        match fs::read(&path) {
            Ok(bytes) => {
                Ok(Some((bytes, mime_guess::from_path(&path).first_or_octet_stream())))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if bad {
        Err(StorageError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Lower-cased `.ext` of the client's file name, or empty when it has none.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|ch| ch.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
