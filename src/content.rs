/*!
 * Access to file content by (version, name)
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::layout;

/// Source of file bytes for delta and pack generation
pub trait ContentAccessor: Send + Sync {
    /// Content of entry `name` as it was at `version`
    fn read(&self, version: u32, name: &str) -> Result<Vec<u8>>;

    /// Target of link entry `name`, the bytes its digest covers
    fn read_link(&self, version: u32, name: &str) -> Result<Vec<u8>>;
}

/// Reads the per-version union tree `image/<version>/full` on disk
#[derive(Debug, Clone)]
pub struct ImageContent {
    state_dir: PathBuf,
}

impl ImageContent {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn path(&self, version: u32, name: &str) -> PathBuf {
        self.state_dir
            .join(layout::full_content_path(version, name))
    }
}

impl ContentAccessor for ImageContent {
    fn read(&self, version: u32, name: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path(version, name))?)
    }

    fn read_link(&self, version: u32, name: &str) -> Result<Vec<u8>> {
        let target = std::fs::read_link(self.path(version, name))?;
        Ok(link_bytes(&target))
    }
}

/// Digestable form of a link target
pub fn link_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().into_owned().into_bytes()
}

/// In-memory content, keyed by version and entry name
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    files: BTreeMap<(u32, String), Vec<u8>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content (or a link target) for `name` at `version`
    pub fn insert(&mut self, version: u32, name: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert((version, name.to_string()), bytes.into());
    }

    fn get(&self, version: u32, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(&(version, name.to_string()))
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} at version {}", name, version),
                )
                .into()
            })
    }
}

impl ContentAccessor for MemoryContent {
    fn read(&self, version: u32, name: &str) -> Result<Vec<u8>> {
        self.get(version, name)
    }

    fn read_link(&self, version: u32, name: &str) -> Result<Vec<u8>> {
        self.get(version, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MixerError;
    use tempfile::TempDir;

    #[test]
    fn test_reads_full_tree() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("image/10/full/usr/bin");
        std::fs::create_dir_all(&full).unwrap();
        std::fs::write(full.join("foo"), b"foo v10").unwrap();

        let content = ImageContent::new(dir.path());
        assert_eq!(content.read(10, "/usr/bin/foo").unwrap(), b"foo v10");
        assert!(matches!(
            content.read(20, "/usr/bin/foo"),
            Err(MixerError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_link_target() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("image/10/full/usr/bin");
        std::fs::create_dir_all(&full).unwrap();
        std::os::unix::fs::symlink("foo", full.join("bar")).unwrap();

        let content = ImageContent::new(dir.path());
        assert_eq!(content.read_link(10, "/usr/bin/bar").unwrap(), b"foo");
    }

    #[test]
    fn test_memory_content() {
        let mut content = MemoryContent::new();
        content.insert(10, "/foo", "content");
        assert_eq!(content.read(10, "/foo").unwrap(), b"content");
        assert!(content.read(20, "/foo").is_err());
    }
}
