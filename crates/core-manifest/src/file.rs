//! Manifest file entries

use crate::digest::Digest;
use crate::flags::{FileStatus, FileType, Flags};

/// One line of a manifest's file section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path inside the bundle tree, or a manifest name on the MoM
    pub name: String,

    /// Version at which this entry last changed
    pub version: u32,

    /// Content digest, zero for directories and deletions
    pub hash: Digest,

    pub flags: Flags,

    /// Content size in bytes. Not part of the text format; only known for
    /// freshly built entries.
    pub size: u64,
}

impl FileEntry {
    /// Regular file entry
    pub fn file(name: impl Into<String>, hash: Digest, size: u64) -> Self {
        Self {
            name: name.into(),
            version: 0,
            hash,
            flags: Flags::of_type(FileType::File),
            size,
        }
    }

    /// Directory entry
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            hash: Digest::ZERO,
            flags: Flags::of_type(FileType::Directory),
            size: 0,
        }
    }

    /// Symlink entry; the digest covers the link target
    pub fn link(name: impl Into<String>, hash: Digest) -> Self {
        Self {
            name: name.into(),
            version: 0,
            hash,
            flags: Flags::of_type(FileType::Link),
            size: 0,
        }
    }

    /// Set the version
    pub fn at_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Turn this entry into a deletion record at `version`
    pub fn into_deleted(mut self, version: u32) -> Self {
        self.version = version;
        self.hash = Digest::ZERO;
        self.size = 0;
        self.flags.status = FileStatus::Deleted;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.is_deleted()
    }

    pub fn is_directory(&self) -> bool {
        self.flags.is_directory()
    }

    /// Regular, present file
    pub fn is_regular_file(&self) -> bool {
        self.flags.file_type == FileType::File && !self.is_deleted()
    }

    /// Whether this entry contributes to a manifest's content size
    pub fn counts_toward_content(&self) -> bool {
        !self.is_deleted() && !self.is_directory()
    }

    /// Same content and kind as `other`, ignoring version and size
    pub fn same_content(&self, other: &FileEntry) -> bool {
        self.hash == other.hash
            && self.flags.file_type == other.flags.file_type
            && self.is_deleted() == other.is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_deleted() {
        let entry = FileEntry::file("/foo", Digest::of(b"x"), 1).at_version(10);
        let deleted = entry.into_deleted(20);
        assert!(deleted.is_deleted());
        assert!(deleted.hash.is_zero());
        assert_eq!(deleted.version, 20);
        assert_eq!(deleted.size, 0);
        assert_eq!(deleted.flags.file_type, FileType::File);
        assert!(!deleted.counts_toward_content());
    }

    #[test]
    fn test_directories_do_not_count() {
        assert!(!FileEntry::directory("/usr").counts_toward_content());
        assert!(FileEntry::file("/a", Digest::of(b"a"), 1).counts_toward_content());
        assert!(FileEntry::link("/l", Digest::of(b"/a")).counts_toward_content());
    }

    #[test]
    fn test_same_content_ignores_version() {
        let a = FileEntry::file("/a", Digest::of(b"a"), 1).at_version(10);
        let b = FileEntry::file("/a", Digest::of(b"a"), 1).at_version(20);
        let c = FileEntry::file("/a", Digest::of(b"b"), 1).at_version(20);
        assert!(a.same_content(&b));
        assert!(!a.same_content(&c));
    }
}
