/*!
 * Manifest of manifests
 */

use std::collections::{BTreeMap, HashSet};

use mixer_core_manifest::{
    delta_name, iterative_name, validate_manifest, Digest, Feature, FileEntry, FileType, Flags,
    Manifest, ManifestHeader, MOM_NAME,
};
use tracing::debug;

use crate::builder::BundleManifest;
use crate::context::BuildContext;
use crate::error::{MixerError, Result};

/// A generated iterative or delta manifest, keyed by bundle name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Version the artifact updates from
    pub from_version: u32,

    /// Version the artifact was written for
    pub version: u32,

    /// Digest of the serialized artifact
    pub digest: Digest,
}

impl ArtifactRef {
    pub fn of(manifest: &Manifest) -> Self {
        Self {
            from_version: manifest.header.previous,
            version: manifest.header.version,
            digest: manifest.digest(),
        }
    }
}

fn reference(name: String, file_type: FileType, artifact: &ArtifactRef) -> FileEntry {
    FileEntry {
        name,
        version: artifact.version,
        hash: artifact.digest,
        flags: Flags::of_type(file_type),
        size: 0,
    }
}

/// Assemble the MoM for `ctx.version`.
///
/// Iterative and delta references are only listed when the format knows
/// them; references to bundles missing from `bundles` are ignored.
pub fn build_mom(
    ctx: &BuildContext,
    bundles: &[BundleManifest],
    iterative: &BTreeMap<String, ArtifactRef>,
    deltas: &BTreeMap<String, ArtifactRef>,
) -> Result<Manifest> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(bundles.len());

    for bundle in bundles {
        if !seen.insert(bundle.name()) {
            return Err(MixerError::Validation(format!(
                "bundle {} listed twice",
                bundle.name()
            )));
        }
        if bundle.version() > ctx.version {
            return Err(MixerError::Validation(format!(
                "bundle {} version {} is newer than MoM version {}",
                bundle.name(),
                bundle.version(),
                ctx.version
            )));
        }

        files.push(FileEntry {
            name: bundle.name().to_string(),
            version: bundle.version(),
            hash: bundle.digest,
            flags: Flags::of_type(FileType::Manifest).with_status(bundle.status),
            size: bundle.manifest.header.content_size,
        });
    }

    if ctx.supports(Feature::IterativeManifest) {
        for (bundle, artifact) in iterative.iter().filter(|(b, _)| seen.contains(b.as_str())) {
            files.push(reference(
                iterative_name(bundle, artifact.from_version),
                FileType::IterativeManifest,
                artifact,
            ));
        }
    }
    if ctx.supports(Feature::DeltaManifest) {
        for (bundle, artifact) in deltas.iter().filter(|(b, _)| seen.contains(b.as_str())) {
            files.push(reference(
                delta_name(bundle, artifact.from_version),
                FileType::DeltaManifest,
                artifact,
            ));
        }
    }

    let mut mom = Manifest::new(
        MOM_NAME,
        ManifestHeader {
            format: ctx.format,
            version: ctx.version,
            previous: ctx.previous,
            timestamp: ctx.timestamp,
            min_version: ctx.header_min_version(),
            ..Default::default()
        },
    );
    mom.files = files;
    mom.sort_files();
    mom.update_totals();
    validate_manifest(&mom)?;

    debug!(
        version = ctx.version,
        format = ctx.format,
        entries = mom.header.file_count,
        "built MoM"
    );
    Ok(mom)
}
