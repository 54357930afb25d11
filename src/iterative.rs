/*!
 * Iterative manifests
 *
 * An iterative manifest lists only the entries of a bundle that changed
 * between two of its manifests, so clients already on the older version can
 * skip the full file list.
 */

use mixer_core_manifest::{supports, Feature, FileEntry, Manifest, ManifestHeader};
use tracing::debug;

use crate::error::{MixerError, Result};

/// Check that `old` and `new` are two versions of the same bundle, oldest first
pub(crate) fn check_transition(old: &Manifest, new: &Manifest) -> Result<()> {
    if old.name != new.name {
        return Err(MixerError::Validation(format!(
            "cannot diff manifests of different bundles: {} and {}",
            old.name, new.name
        )));
    }
    if new.header.version <= old.header.version {
        return Err(MixerError::Validation(format!(
            "{}: version {} is not newer than {}",
            new.name, new.header.version, old.header.version
        )));
    }
    Ok(())
}

/// Build the iterative manifest taking `old` to `new`.
///
/// Returns `Ok(None)` when the format has no iterative manifests, when the
/// two manifests were written at different formats, or when nothing changed.
pub fn build_iterative(format: u32, old: &Manifest, new: &Manifest) -> Result<Option<Manifest>> {
    check_transition(old, new)?;

    if !supports(format, Feature::IterativeManifest) {
        return Ok(None);
    }
    if old.header.format != new.header.format {
        debug!(
            bundle = %new.name,
            from = old.header.format,
            to = new.header.format,
            "no iterative manifest across a format change"
        );
        return Ok(None);
    }

    let since = old.header.version;
    let mut files: Vec<FileEntry> = new
        .files
        .iter()
        .filter(|entry| entry.version > since)
        .cloned()
        .collect();

    for gone in old
        .files
        .iter()
        .filter(|entry| !entry.is_deleted() && new.find(&entry.name).is_none())
    {
        files.push(gone.clone().into_deleted(new.header.version));
    }

    if files.is_empty() {
        return Ok(None);
    }

    let mut manifest = Manifest::new(
        new.name.clone(),
        ManifestHeader {
            format: new.header.format,
            version: new.header.version,
            previous: since,
            timestamp: new.header.timestamp,
            min_version: new.header.min_version,
            includes: new.header.includes.clone(),
            ..Default::default()
        },
    );
    manifest.files = files;
    manifest.sort_files();
    manifest.update_totals();

    debug!(
        bundle = %manifest.name,
        from = since,
        to = manifest.header.version,
        entries = manifest.header.file_count,
        "built iterative manifest"
    );
    Ok(Some(manifest))
}
