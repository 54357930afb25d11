//! mixer Core Interface: path-addressed storage
//!
//! Manifests, MoMs and packs are read and written through the `Storage` trait
//! using paths relative to the state directory (`www/<version>/Manifest.MoM`,
//! `image/LAST_VER`, ...). The build engine never publishes partial artifacts:
//! `write_atomic` must make the complete content visible at once or not at all.
//!
//! # Example
//!
//! ```rust
//! use mixer_core_interface::{MemoryStorage, Storage};
//! use std::path::Path;
//!
//! let storage = MemoryStorage::new();
//! storage.write_atomic(Path::new("www/10/Manifest.MoM"), b"MANIFEST\t26\n").unwrap();
//! assert!(storage.exists(Path::new("www/10/Manifest.MoM")));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Path escapes storage root: {0}")]
    InvalidPath(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage error: {0}")]
    System(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Path-addressed byte storage
///
/// Implementations must be `Send + Sync` so per-bundle build tasks can share
/// one instance.
pub trait Storage: Send + Sync {
    /// Read a whole object
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace an object atomically
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Check whether an object exists
    fn exists(&self, path: &Path) -> bool;

    /// Read an object as UTF-8 text
    fn read_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| StorageError::System(format!("{}: {}", path.display(), e)))
    }
}

/// Reject absolute paths and `..` so every object stays under the root
fn check_relative(path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(path.to_path_buf()));
    }
    Ok(())
}

/// Storage on the local filesystem, rooted at the state directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a storage path
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        check_relative(path)?;
        Ok(self.root.join(path))
    }
}

impl Storage for LocalStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_path_buf()),
            _ => StorageError::Io(e),
        })
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        let dir = full
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;
        fs::create_dir_all(dir)?;

        // Temp file in the target directory so the rename stays on one filesystem.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(&full).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|full| full.exists()).unwrap_or(false)
    }
}

/// In-memory storage for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::System("storage lock poisoned".to_string())
}

impl Storage for MemoryStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        check_relative(path)?;
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        check_relative(path)?;
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }
}
