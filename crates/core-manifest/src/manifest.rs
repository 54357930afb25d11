//! Manifest model
//!
//! A manifest is a header plus a name-sorted list of file entries. Bundle
//! manifests, iterative and delta manifests and the MoM all share this shape.

use crate::file::FileEntry;
use crate::size::clamp_content_size;

/// Name under which the manifest of manifests is stored
pub const MOM_NAME: &str = "MoM";

/// Manifest header fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestHeader {
    /// On-disk format
    pub format: u32,

    /// Release version this manifest describes
    pub version: u32,

    /// Version of the manifest this one supersedes, 0 for the first
    pub previous: u32,

    pub file_count: u32,

    /// Unix seconds
    pub timestamp: i64,

    /// Aggregate size of non-deleted, non-directory entries after clamping
    pub content_size: u64,

    /// Only present when the format allows it
    pub min_version: Option<u32>,

    /// Bundles this bundle depends on
    pub includes: Vec<String>,
}

/// In-memory manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Bundle name; not serialized
    pub name: String,
    pub header: ManifestHeader,
    pub files: Vec<FileEntry>,
}

impl Manifest {
    /// Empty manifest for `name`
    pub fn new(name: impl Into<String>, header: ManifestHeader) -> Self {
        Self {
            name: name.into(),
            header,
            files: Vec::new(),
        }
    }

    /// Placeholder for a bundle that has no prior manifest
    pub fn empty(name: impl Into<String>, format: u32) -> Self {
        Self::new(
            name,
            ManifestHeader {
                format,
                ..Default::default()
            },
        )
    }

    pub fn is_mom(&self) -> bool {
        self.name == MOM_NAME
    }

    /// File name inside a version directory
    pub fn file_name(&self) -> String {
        manifest_file_name(&self.name)
    }

    /// Stable sort of entries by name
    pub fn sort_files(&mut self) {
        self.files.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Look up an entry by name. Requires sorted entries.
    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.files
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.files[idx])
    }

    /// Raw sum of entry sizes, before clamping
    pub fn raw_content_size(&self) -> u64 {
        self.files
            .iter()
            .filter(|entry| entry.counts_toward_content())
            .fold(0u64, |acc, entry| acc.saturating_add(entry.size))
    }

    /// Recompute file count and clamped content size from the entries
    pub fn update_totals(&mut self) {
        self.header.file_count = self.files.len() as u32;
        self.header.content_size = clamp_content_size(self.header.format, self.raw_content_size());
    }
}

/// `Manifest.<name>`
pub fn manifest_file_name(name: &str) -> String {
    format!("Manifest.{}", name)
}

/// MoM entry name of an iterative manifest: `<bundle>.I.<from>`
pub fn iterative_name(bundle: &str, from: u32) -> String {
    format!("{}.I.{}", bundle, from)
}

/// MoM entry name of a delta manifest: `<bundle>.D.<from>`
pub fn delta_name(bundle: &str, from: u32) -> String {
    format!("{}.D.{}", bundle, from)
}
