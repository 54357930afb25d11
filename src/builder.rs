/*!
 * Manifest builder
 *
 * Turns a bundle's scanned file list into its manifest for one version:
 * last-changed versions are carried forward from the previous manifest,
 * deletions are recorded, and format policy decides which header fields
 * may be emitted.
 */

use std::collections::HashSet;

use mixer_core_manifest::{
    validate_manifest, BundleHeader, Digest, Feature, FileEntry, FileStatus, Manifest,
    ManifestHeader,
};
use tracing::debug;

use crate::context::BuildContext;
use crate::error::{MixerError, Result};

/// A bundle manifest ready to be listed on the MoM
#[derive(Debug, Clone)]
pub struct BundleManifest {
    pub manifest: Manifest,

    /// Status facet of the bundle's MoM entry
    pub status: FileStatus,

    /// Digest of the serialized manifest
    pub digest: Digest,
}

impl BundleManifest {
    /// Wrap a manifest, deriving the MoM status from the bundle header
    pub fn new(manifest: Manifest, header: &BundleHeader, format: u32) -> Self {
        let digest = manifest.digest();
        Self {
            manifest,
            status: header.mom_status(format),
            digest,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> u32 {
        self.manifest.header.version
    }
}

/// Build a bundle manifest for `ctx.version`.
///
/// `files` carry their last-changed versions (see [`carry_forward`]); entries
/// with version 0 are treated as changed in this version.
pub fn build_manifest(
    ctx: &BuildContext,
    bundle: &str,
    previous: u32,
    mut files: Vec<FileEntry>,
    includes: Vec<String>,
    header: &BundleHeader,
) -> Result<BundleManifest> {
    if bundle.is_empty() {
        return Err(MixerError::Validation("bundle name is empty".to_string()));
    }
    if previous >= ctx.version {
        return Err(MixerError::Validation(format!(
            "{}: previous version {} is not older than {}",
            bundle, previous, ctx.version
        )));
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    for pair in files.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(MixerError::Validation(format!(
                "{}: duplicate entry {}",
                bundle, pair[0].name
            )));
        }
    }
    for entry in &mut files {
        if entry.version == 0 {
            entry.version = ctx.version;
        }
    }

    let mut manifest = Manifest::new(
        bundle,
        ManifestHeader {
            format: ctx.format,
            version: ctx.version,
            previous,
            timestamp: ctx.timestamp,
            min_version: ctx.header_min_version(),
            includes,
            ..Default::default()
        },
    );
    manifest.files = files;
    manifest.update_totals();
    validate_manifest(&manifest)?;

    debug!(
        bundle,
        version = ctx.version,
        previous,
        files = manifest.header.file_count,
        contentsize = manifest.header.content_size,
        "built manifest"
    );

    Ok(BundleManifest::new(manifest, header, ctx.format))
}

/// Assign last-changed versions to freshly scanned entries and record deletions.
///
/// Unchanged entries keep the version from `old`; changed or new ones get
/// `ctx.version`. Entries that disappeared become deleted records. Deleted
/// records older than the minversion are dropped once the format allows a
/// minversion, since no client can still need them.
pub fn carry_forward(
    ctx: &BuildContext,
    scanned: Vec<FileEntry>,
    old: Option<&Manifest>,
) -> Vec<FileEntry> {
    let names: HashSet<String> = scanned.iter().map(|e| e.name.clone()).collect();
    let mut files: Vec<FileEntry> = scanned
        .into_iter()
        .map(|mut entry| {
            entry.version = match old.and_then(|m| m.find(&entry.name)) {
                Some(prev) if !prev.is_deleted() && prev.same_content(&entry) => prev.version,
                _ => ctx.version,
            };
            entry
        })
        .collect();

    let prune_before = if ctx.supports(Feature::MinVersionHeader) {
        ctx.min_version
    } else {
        0
    };

    if let Some(old) = old {
        for prev in old.files.iter().filter(|e| !names.contains(&e.name)) {
            if !prev.is_deleted() {
                files.push(prev.clone().into_deleted(ctx.version));
            } else if prev.version >= prune_before {
                files.push(prev.clone());
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

/// Whether a rebuilt file list is identical to the previous manifest
pub fn is_unchanged(old: &Manifest, files: &[FileEntry], includes: &[String], format: u32) -> bool {
    old.header.format == format
        && old.header.includes == includes
        && old.files.len() == files.len()
        && old.files.iter().zip(files).all(|(a, b)| {
            a.name == b.name && a.version == b.version && a.same_content(b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixer_core_manifest::{BundleStatus, FileType, BAD_MAX};

    fn ctx(format: u32, version: u32, previous: u32, min_version: u32) -> BuildContext {
        BuildContext::new(format, version, previous, min_version)
            .unwrap()
            .with_timestamp(1_000)
    }

    fn foo(content: &[u8]) -> FileEntry {
        FileEntry::file("/foo", Digest::of(content), content.len() as u64)
    }

    fn includes() -> Vec<String> {
        vec!["os-core".to_string()]
    }

    #[test]
    fn test_build_counts_and_sizes() {
        let files = vec![
            foo(b"content"),
            FileEntry::directory("/usr/share"),
            FileEntry::file("/gone", Digest::of(b"x"), 1).into_deleted(10),
        ];
        let built = build_manifest(
            &ctx(25, 10, 0, 0),
            "test-bundle",
            0,
            files,
            includes(),
            &BundleHeader::default(),
        )
        .unwrap();
        let header = &built.manifest.header;
        assert_eq!(header.file_count, 3);
        assert_eq!(header.content_size, 7);
        assert_eq!(header.timestamp, 1_000);
        assert_eq!(built.manifest.files[0].name, "/foo");
        assert_eq!(built.manifest.find("/foo").unwrap().version, 10);
        assert_eq!(built.digest, built.manifest.digest());
    }

    #[test]
    fn test_minversion_omitted_before_format_26() {
        let built = build_manifest(
            &ctx(25, 20, 10, 20),
            "test-bundle",
            10,
            vec![foo(b"new content")],
            includes(),
            &BundleHeader::default(),
        )
        .unwrap();
        assert_eq!(built.manifest.header.min_version, None);
        assert!(!built.manifest.to_text().contains("minversion:\t"));
    }

    #[test]
    fn test_minversion_emitted_from_format_26() {
        let built = build_manifest(
            &ctx(26, 30, 20, 20),
            "test-bundle",
            20,
            vec![foo(b"even newer content")],
            includes(),
            &BundleHeader::default(),
        )
        .unwrap();
        assert!(built.manifest.to_text().contains("minversion:\t20\n"));
    }

    #[test]
    fn test_content_size_clamped_for_format_25_only() {
        let huge = FileEntry::file("/big", Digest::of(b"big"), BAD_MAX + 1);
        let at_25 = build_manifest(
            &ctx(25, 10, 0, 0),
            "b",
            0,
            vec![huge.clone()],
            vec![],
            &BundleHeader::default(),
        )
        .unwrap();
        assert_eq!(at_25.manifest.header.content_size, BAD_MAX - 1);

        let at_26 = build_manifest(
            &ctx(26, 10, 0, 0),
            "b",
            0,
            vec![huge],
            vec![],
            &BundleHeader::default(),
        )
        .unwrap();
        assert_eq!(at_26.manifest.header.content_size, BAD_MAX + 1);
    }

    #[test]
    fn test_experimental_status_gated() {
        let header = BundleHeader {
            status: BundleStatus::Experimental,
            ..Default::default()
        };
        let at_26 =
            build_manifest(&ctx(26, 10, 0, 0), "b", 0, vec![foo(b"x")], vec![], &header).unwrap();
        assert_eq!(at_26.status, FileStatus::Unset);
        let at_27 =
            build_manifest(&ctx(27, 10, 0, 0), "b", 0, vec![foo(b"x")], vec![], &header).unwrap();
        assert_eq!(at_27.status, FileStatus::Experimental);
        // The bundle manifest itself never carries the flag.
        assert!(!at_27.manifest.to_text().contains("Me.."));
    }

    #[test]
    fn test_validation_errors() {
        let header = BundleHeader::default();
        let c = ctx(26, 20, 10, 0);
        assert!(build_manifest(&c, "", 0, vec![], vec![], &header)
            .unwrap_err()
            .is_validation());
        assert!(build_manifest(&c, "b", 20, vec![], vec![], &header)
            .unwrap_err()
            .is_validation());
        let dup = vec![foo(b"a"), foo(b"b")];
        assert!(build_manifest(&c, "b", 10, dup, vec![], &header)
            .unwrap_err()
            .is_validation());
        let future = vec![foo(b"a").at_version(30)];
        assert!(build_manifest(&c, "b", 10, future, vec![], &header).is_err());
    }

    fn old_manifest() -> Manifest {
        build_manifest(
            &ctx(26, 10, 0, 0),
            "b",
            0,
            vec![
                foo(b"content"),
                FileEntry::file("/keep", Digest::of(b"keep"), 4),
                FileEntry::file("/remove", Digest::of(b"remove"), 6),
                FileEntry::file("/ancient", Digest::of(b"a"), 1).into_deleted(5),
            ],
            vec![],
            &BundleHeader::default(),
        )
        .unwrap()
        .manifest
    }

    #[test]
    fn test_carry_forward_versions_and_deletions() {
        let old = old_manifest();
        let scanned = vec![
            foo(b"new content"),
            FileEntry::file("/keep", Digest::of(b"keep"), 4),
            FileEntry::file("/added", Digest::of(b"added"), 5),
        ];
        let files = carry_forward(&ctx(26, 20, 10, 0), scanned, Some(&old));
        let by_name = |n: &str| files.iter().find(|e| e.name == n).unwrap();

        assert_eq!(by_name("/foo").version, 20);
        assert_eq!(by_name("/keep").version, 10);
        assert_eq!(by_name("/added").version, 20);
        let removed = by_name("/remove");
        assert!(removed.is_deleted());
        assert_eq!(removed.version, 20);
        assert_eq!(removed.flags.file_type, FileType::File);
        // Deleted records are carried unchanged without a minversion.
        assert_eq!(by_name("/ancient").version, 5);
        assert!(files.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn test_carry_forward_prunes_old_deletions() {
        let old = old_manifest();
        let scanned = vec![foo(b"content"), FileEntry::file("/keep", Digest::of(b"keep"), 4)];
        let files = carry_forward(&ctx(26, 20, 10, 10), scanned.clone(), Some(&old));
        assert!(files.iter().all(|e| e.name != "/ancient"));

        // Format 25 has no minversion, so nothing is pruned.
        let files = carry_forward(&ctx(25, 20, 10, 10), scanned, Some(&old));
        assert!(files.iter().any(|e| e.name == "/ancient"));
    }

    #[test]
    fn test_unchanged_detection() {
        let old = old_manifest();
        let scanned = vec![
            foo(b"content"),
            FileEntry::file("/keep", Digest::of(b"keep"), 4),
            FileEntry::file("/remove", Digest::of(b"remove"), 6),
        ];
        let files = carry_forward(&ctx(26, 20, 10, 0), scanned, Some(&old));
        assert!(is_unchanged(&old, &files, &[], 26));
        assert!(!is_unchanged(&old, &files, &["os-core".to_string()], 26));
        assert!(!is_unchanged(&old, &files, &[], 27));

        let changed = carry_forward(&ctx(26, 20, 10, 0), vec![foo(b"content")], Some(&old));
        assert!(!is_unchanged(&old, &changed, &[], 26));
    }
}
