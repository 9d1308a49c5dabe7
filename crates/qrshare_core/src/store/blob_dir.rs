//! Filesystem blob store.
//!
//! Each object lives at `<root>/<key>` with a bincode sidecar `<key>.meta`
//! holding its [`BlobMeta`]. Both files are written through a temp file and a
//! rename; the sidecar goes last, so an object without a readable sidecar was
//! never fully written and is reported as absent.

use super::{BlobMeta, BlobObject, BlobStore};
use crate::error::AppError;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

const META_SUFFIX: &str = ".meta";

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BlobDir {
    root: PathBuf,
}

impl BlobDir {
    /// Open (creating if needed) a blob directory.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create blob directory '{}': {}",
                root.display(),
                err
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, AppError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Reject keys that would escape the root or are ambiguous across platforms.
fn validate_key(key: &str) -> Result<(), AppError> {
    let invalid = |reason: &str| {
        Err(AppError::BadRequest(format!(
            "Invalid blob key '{}': {}",
            key, reason
        )))
    };
    if key.is_empty() {
        return invalid("empty");
    }
    if key.contains('\\') {
        return invalid("backslash");
    }
    if key.ends_with(META_SUFFIX) {
        return invalid("reserved suffix");
    }
    for component in Path::new(key).components() {
        match component {
            Component::Normal(_) => {}
            _ => return invalid("must be a relative path without '.' or '..'"),
        }
    }
    if key.split('/').any(str::is_empty) {
        return invalid("empty path segment");
    }
    Ok(())
}

fn meta_path(object_path: &Path) -> PathBuf {
    let mut name = OsString::from(object_path.as_os_str());
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    if let Err(err) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        if let Err(cleanup_err) = fs::remove_file(&tmp) {
            if cleanup_err.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove temp blob {:?}: {}", tmp, cleanup_err);
            }
        }
        return Err(err.into());
    }
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, AppError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn remove_optional(path: &Path) -> Result<bool, AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn read_meta(object_path: &Path) -> Result<Option<BlobMeta>, AppError> {
    match read_optional(&meta_path(object_path))? {
        Some(encoded) => Ok(Some(bincode::deserialize(&encoded)?)),
        None => Ok(None),
    }
}

impl BlobStore for BlobDir {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<BlobMeta, AppError> {
        let path = self.object_path(key)?;
        let meta = BlobMeta::describe(bytes, content_type);
        let encoded_meta = bincode::serialize(&meta)?;
        write_atomic(&path, bytes)?;
        write_atomic(&meta_path(&path), &encoded_meta)?;
        tracing::debug!(key, size = meta.size, "stored blob");
        Ok(meta)
    }

    fn get(&self, key: &str) -> Result<Option<BlobObject>, AppError> {
        let path = self.object_path(key)?;
        let Some(meta) = read_meta(&path)? else {
            return Ok(None);
        };
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };
        Ok(Some(BlobObject { meta, bytes }))
    }

    fn head(&self, key: &str) -> Result<Option<BlobMeta>, AppError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        read_meta(&path)
    }

    // Sidecar first: once it is gone the object reads as absent. A data file
    // left without a sidecar is cleaned up but was never a stored object.
    fn delete(&self, key: &str) -> Result<bool, AppError> {
        let path = self.object_path(key)?;
        let had_meta = remove_optional(&meta_path(&path))?;
        remove_optional(&path)?;
        if had_meta {
            tracing::debug!(key, "deleted blob");
        }
        Ok(had_meta)
    }
}
