/*!
 * Binary deltas between two versions of a bundle
 *
 * For every regular file whose content changed between two manifests and
 * whose new size passes the threshold, an rsync-style delta rebuilds the new
 * content from the old one. Deltas are only produced for formats that know
 * delta manifests.
 */

pub mod algorithm;
pub mod checksum;
pub mod types;

pub use algorithm::{generate_delta, reconstruct, SignatureIndex};
pub use checksum::{calculate_strong_hash, generate_signatures, RollingChecksum};
pub use types::{BlockSignature, Delta, DeltaInstruction, DeltaStats};

use mixer_core_manifest::{supports, Digest, Feature, FileEntry, Manifest};
use tracing::debug;

use crate::config::{MixConfig, DEFAULT_DELTA_BLOCK_SIZE, MINIMUM_SIZE_TO_MAKE_DELTA};
use crate::content::ContentAccessor;
use crate::error::{MixerError, Result};
use crate::iterative::check_transition;

/// When and how deltas are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaPolicy {
    /// New files smaller than this are shipped whole
    pub min_size: u64,

    /// Signature block size
    pub block_size: usize,
}

impl Default for DeltaPolicy {
    fn default() -> Self {
        Self {
            min_size: MINIMUM_SIZE_TO_MAKE_DELTA,
            block_size: DEFAULT_DELTA_BLOCK_SIZE,
        }
    }
}

impl From<&MixConfig> for DeltaPolicy {
    fn from(config: &MixConfig) -> Self {
        Self {
            min_size: config.delta_min_size,
            block_size: config.delta_block_size,
        }
    }
}

/// Entry pairs eligible for a delta: regular in both, content changed
pub fn delta_candidates<'a>(
    old: &'a Manifest,
    new: &'a Manifest,
) -> impl Iterator<Item = (&'a FileEntry, &'a FileEntry)> + 'a {
    new.files
        .iter()
        .filter(|entry| entry.is_regular_file())
        .filter_map(move |entry| {
            old.find(&entry.name)
                .filter(|prev| prev.is_regular_file() && prev.hash != entry.hash)
                .map(|prev| (prev, entry))
        })
}

/// Read content and check it against the manifest digest
pub(crate) fn read_verified(
    content: &dyn ContentAccessor,
    entry: &FileEntry,
) -> Result<Vec<u8>> {
    let bytes = content.read(entry.version, &entry.name)?;
    let actual = Digest::of(&bytes);
    if actual != entry.hash {
        return Err(MixerError::ChecksumMismatch {
            expected: entry.hash.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(bytes)
}

/// Compute the delta for one file, checking that it reproduces `new_bytes`
pub fn diff(
    old_entry: &FileEntry,
    new_entry: &FileEntry,
    old_bytes: &[u8],
    new_bytes: &[u8],
    block_size: usize,
) -> Result<(Delta, DeltaStats)> {
    let index = SignatureIndex::new(generate_signatures(old_bytes, block_size), block_size);
    let (instructions, stats) = generate_delta(new_bytes, &index);
    let delta = Delta {
        path: new_entry.name.clone(),
        from_version: old_entry.version,
        to_version: new_entry.version,
        from_hash: old_entry.hash,
        to_hash: new_entry.hash,
        instructions,
    };
    apply_delta(old_bytes, &delta)?;
    Ok((delta, stats))
}

/// Serialized size of a delta inside a pack
pub fn encoded_len(delta: &Delta) -> Result<u64> {
    bincode::serialized_size(delta).map_err(MixerError::from)
}

/// Build the deltas taking `old` to `new`.
///
/// Returns no deltas when the format predates delta manifests. Every regular
/// file that changed and whose new content is at least `policy.min_size`
/// bytes gets exactly one delta.
pub fn build_deltas(
    format: u32,
    old: &Manifest,
    new: &Manifest,
    content: &dyn ContentAccessor,
    policy: &DeltaPolicy,
) -> Result<Vec<Delta>> {
    check_transition(old, new)?;
    if !supports(format, Feature::DeltaManifest) {
        return Ok(Vec::new());
    }

    let mut deltas = Vec::new();
    for (old_entry, new_entry) in delta_candidates(old, new) {
        let new_bytes = read_verified(content, new_entry)?;
        if (new_bytes.len() as u64) < policy.min_size {
            continue;
        }
        let old_bytes = read_verified(content, old_entry)?;

        let (delta, stats) = diff(old_entry, new_entry, &old_bytes, &new_bytes, policy.block_size)?;
        debug!(
            bundle = %new.name,
            file = %new_entry.name,
            from = delta.from_version,
            to = delta.to_version,
            reused = stats.bytes_reused,
            literal = stats.bytes_literal,
            encoded = encoded_len(&delta)?,
            "built delta"
        );
        deltas.push(delta);
    }

    Ok(deltas)
}

/// Rebuild new content from `old` using `delta`.
///
/// Both ends are verified: `old` must hash to `from_hash` and the result to
/// `to_hash`.
pub fn apply_delta(old: &[u8], delta: &Delta) -> Result<Vec<u8>> {
    let source = Digest::of(old);
    if source != delta.from_hash {
        return Err(MixerError::ChecksumMismatch {
            expected: delta.from_hash.to_hex(),
            actual: source.to_hex(),
        });
    }

    let rebuilt = reconstruct(old, &delta.instructions)?;
    let actual = Digest::of(&rebuilt);
    if actual != delta.to_hash {
        return Err(MixerError::ChecksumMismatch {
            expected: delta.to_hash.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContent;
    use mixer_core_manifest::ManifestHeader;

    fn large(tail: &str) -> Vec<u8> {
        let mut bytes = "large".repeat(1000).into_bytes();
        bytes.extend_from_slice(tail.as_bytes());
        bytes
    }

    struct Fixture {
        content: MemoryContent,
        old: Manifest,
        new: Manifest,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                content: MemoryContent::new(),
                old: manifest(10),
                new: manifest(20),
            }
        }

        fn put(&mut self, version: u32, name: &str, bytes: &[u8]) {
            self.content.insert(version, name, bytes);
            let target = if version == 10 {
                &mut self.old
            } else {
                &mut self.new
            };
            target.files.push(
                FileEntry::file(name, Digest::of(bytes), bytes.len() as u64).at_version(version),
            );
            target.sort_files();
            target.update_totals();
        }

        fn deltas(&self, format: u32) -> Result<Vec<Delta>> {
            build_deltas(format, &self.old, &self.new, &self.content, &DeltaPolicy::default())
        }
    }

    fn manifest(version: u32) -> Manifest {
        Manifest::new(
            "test-bundle",
            ManifestHeader {
                format: 26,
                version,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_delta_for_large_changed_file() {
        let mut fx = Fixture::new();
        fx.put(10, "/foo", &large("A"));
        fx.put(20, "/foo", &large("B"));

        let deltas = fx.deltas(26).unwrap();
        assert_eq!(deltas.len(), 1);

        let delta = &deltas[0];
        assert_eq!(delta.path, "/foo");
        assert_eq!((delta.from_version, delta.to_version), (10, 20));
        assert!(encoded_len(delta).unwrap() < large("B").len() as u64);
        assert_eq!(apply_delta(&large("A"), delta).unwrap(), large("B"));
    }

    #[test]
    fn test_no_delta_before_format_26() {
        let mut fx = Fixture::new();
        fx.put(10, "/foo", &large("A"));
        fx.put(20, "/foo", &large("B"));

        let deltas = fx.deltas(25).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_no_delta_below_threshold() {
        let mut fx = Fixture::new();
        fx.put(10, "/foo", b"small content");
        fx.put(20, "/foo", b"small content, changed");

        let deltas = fx.deltas(26).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_no_delta_for_added_or_unchanged_files() {
        let mut fx = Fixture::new();
        fx.put(10, "/same", &large("S"));
        fx.put(20, "/same", &large("S"));
        fx.put(20, "/added", &large("N"));

        let deltas = fx.deltas(26).unwrap();
        assert!(deltas.is_empty());
        assert_eq!(delta_candidates(&fx.old, &fx.new).count(), 0);
    }

    #[test]
    fn test_unrelated_content_still_gets_delta() {
        let mut fx = Fixture::new();
        let old: Vec<u8> = (0..4000u32).map(|i| (i * 13 % 256) as u8).collect();
        let new: Vec<u8> = (0..4000u32).map(|i| (i * 7 % 255) as u8 ^ 0x5a).collect();
        fx.put(10, "/blob", &old);
        fx.put(20, "/blob", &new);

        let deltas = fx.deltas(26).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].literal_len(), 4000);
        assert_eq!(apply_delta(&old, &deltas[0]).unwrap(), new);
    }

    #[test]
    fn test_small_changed_file_below_block_size() {
        crate::logging::init_test_logging();
        let mut fx = Fixture::new();
        let old = vec![b'x'; 600];
        let mut new = old.clone();
        new[300] = b'y';
        fx.put(10, "/foo", &old);
        fx.put(20, "/foo", &new);

        let deltas = fx.deltas(26).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].output_len(), 600);
        assert_eq!(apply_delta(&old, &deltas[0]).unwrap(), new);
    }

    #[test]
    fn test_threshold_boundary() {
        let min = MINIMUM_SIZE_TO_MAKE_DELTA as usize;

        let mut at = Fixture::new();
        at.put(10, "/foo", &vec![b'a'; min]);
        at.put(20, "/foo", &vec![b'b'; min]);
        assert_eq!(at.deltas(26).unwrap().len(), 1);

        let mut below = Fixture::new();
        below.put(10, "/foo", &vec![b'a'; min]);
        below.put(20, "/foo", &vec![b'b'; min - 1]);
        assert!(below.deltas(26).unwrap().is_empty());
    }

    #[test]
    fn test_content_digest_mismatch() {
        let mut fx = Fixture::new();
        fx.put(10, "/foo", &large("A"));
        fx.put(20, "/foo", &large("B"));
        fx.content.insert(20, "/foo", "tampered");

        let err = fx.deltas(26).unwrap_err();
        assert!(matches!(err, MixerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_apply_delta_rejects_wrong_source() {
        let old_entry = FileEntry::file("/foo", Digest::of(&large("A")), 5001).at_version(10);
        let new_entry = FileEntry::file("/foo", Digest::of(&large("B")), 5001).at_version(20);
        let (delta, _) = diff(&old_entry, &new_entry, &large("A"), &large("B"), 1024).unwrap();

        let err = apply_delta(&large("C"), &delta).unwrap_err();
        assert!(matches!(err, MixerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_policy_from_config() {
        let config = MixConfig {
            delta_min_size: 4096,
            delta_block_size: 512,
            ..Default::default()
        };
        let policy = DeltaPolicy::from(&config);
        assert_eq!(policy.min_size, 4096);
        assert_eq!(policy.block_size, 512);
    }
}
