//! Structural validation of manifests
//!
//! Checks the invariants a manifest must satisfy before it may be published.

use crate::error::{Error, Result};
use crate::format::{supports, Feature};
use crate::manifest::Manifest;

/// Validate a manifest's header against its entries
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    let header = &manifest.header;

    if manifest.name.is_empty() {
        return Err(Error::validation("manifest has no bundle name"));
    }
    if header.version == 0 {
        return Err(Error::validation(format!(
            "{}: version must be non-zero",
            manifest.name
        )));
    }
    if header.previous >= header.version {
        return Err(Error::validation(format!(
            "{}: previous version {} is not older than version {}",
            manifest.name, header.previous, header.version
        )));
    }
    if header.file_count as usize != manifest.files.len() {
        return Err(Error::validation(format!(
            "{}: filecount {} does not match {} entries",
            manifest.name,
            header.file_count,
            manifest.files.len()
        )));
    }
    if header.min_version.is_some() && !supports(header.format, Feature::MinVersionHeader) {
        return Err(Error::validation(format!(
            "{}: minversion is not allowed in format {}",
            manifest.name, header.format
        )));
    }

    for pair in manifest.files.windows(2) {
        if pair[0].name >= pair[1].name {
            return Err(Error::validation(format!(
                "{}: entries not sorted or duplicated at {}",
                manifest.name, pair[1].name
            )));
        }
    }

    for entry in &manifest.files {
        if entry.version > header.version {
            return Err(Error::validation(format!(
                "{}: entry {} has version {} newer than manifest version {}",
                manifest.name, entry.name, entry.version, header.version
            )));
        }
        if entry.is_deleted() && !entry.hash.is_zero() {
            return Err(Error::validation(format!(
                "{}: deleted entry {} carries a content hash",
                manifest.name, entry.name
            )));
        }
    }

    Ok(())
}
