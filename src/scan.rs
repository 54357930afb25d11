/*!
 * Bundle tree scanning
 *
 * Walks `image/<version>/<bundle>` and turns every object below it into a
 * manifest entry. Versions are left at 0; `builder::carry_forward` assigns
 * them.
 */

use std::path::{Path, PathBuf};

use mixer_core_manifest::{BundleHeader, Digest, FileEntry, FileModifier, FileType, Flags};
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::content::link_bytes;
use crate::error::{MixerError, Result};

/// Optional per-bundle definition stored next to the bundle tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    #[serde(default)]
    pub header: BundleHeader,

    /// Bundles this bundle depends on
    #[serde(default)]
    pub includes: Vec<String>,
}

/// Read a bundle info file
pub fn load_bundle_info(path: &Path) -> Result<BundleInfo> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Absolute entry name for a path below the bundle root
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", parts.join("/")))
}

/// Scan a bundle tree into name-sorted entries
pub fn scan_bundle(dir: &Path) -> Result<Vec<FileEntry>> {
    if !dir.is_dir() {
        return Err(MixerError::BundleNotFound(PathBuf::from(dir)));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let Some(name) = entry_name(dir, entry.path()) else {
            continue;
        };

        let file_type = entry.file_type();
        let scanned = if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path())?;
            FileEntry::link(name.as_str(), Digest::of(&link_bytes(&target)))
        } else if file_type.is_dir() {
            FileEntry::directory(name.as_str())
        } else {
            let bytes = std::fs::read(entry.path())?;
            FileEntry::file(name.as_str(), Digest::of(&bytes), bytes.len() as u64)
        };

        let flags = Flags::of_type(scanned.flags.file_type)
            .with_modifier(FileModifier::for_path(&name));
        files.push(scanned.with_flags(flags));
    }

    // Directory order is not byte order ("a-b" sorts before "a/c" here).
    files.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        dir = %dir.display(),
        entries = files.len(),
        links = files.iter().filter(|e| e.flags.file_type == FileType::Link).count(),
        "scanned bundle"
    );
    Ok(files)
}
