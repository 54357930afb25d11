/*!
 * Packs
 *
 * A pack holds everything a client at `from` needs to reach `to` for one
 * bundle: binary deltas, whole files, tombstones and directories. Items are
 * sorted by path and the encoding is deterministic, so rebuilding a pack
 * yields identical bytes.
 *
 * On disk: `PACK_MAGIC`, a little-endian `u16` layout version, then the
 * zstd-compressed bincode encoding of [`Pack`].
 */

use std::collections::BTreeMap;
use std::io::Write;

use mixer_core_manifest::{Digest, FileEntry, FileType, Manifest, ManifestHeader};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zstd::stream::{Decoder as ZstdDecoder, Encoder as ZstdEncoder};

use crate::content::ContentAccessor;
use crate::delta::{build_deltas, read_verified, Delta, DeltaPolicy};
use crate::error::{MixerError, Result};
use crate::iterative::check_transition;
use crate::layout;

pub const PACK_MAGIC: &[u8; 8] = b"MIXPACK\0";
pub const PACK_VERSION: u16 = 1;

/// One path's worth of pack content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackItem {
    /// Binary delta against the client's copy
    Delta(Delta),

    /// Complete content; for links, the link target
    Full {
        path: String,
        version: u32,
        file_type: FileType,
        content: Vec<u8>,
    },

    /// File removed since `from`
    Tombstone { path: String, version: u32 },

    /// Directory added or changed since `from`
    Directory { path: String, version: u32 },
}

impl PackItem {
    pub fn path(&self) -> &str {
        match self {
            PackItem::Delta(delta) => &delta.path,
            PackItem::Full { path, .. }
            | PackItem::Tombstone { path, .. }
            | PackItem::Directory { path, .. } => path,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, PackItem::Delta(_))
    }
}

/// Update archive for one bundle between two versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    pub bundle: String,

    /// Version the client has; 0 for a full ("zero") pack
    pub from: u32,

    /// Version the pack brings the client to
    pub to: u32,

    /// Sorted by path
    pub items: Vec<PackItem>,
}

impl Pack {
    /// `pack-<bundle>-from-<from>.pack`
    pub fn file_name(&self) -> String {
        layout::pack_file_name(&self.bundle, self.from)
    }

    pub fn deltas(&self) -> impl Iterator<Item = &Delta> {
        self.items.iter().filter_map(|item| match item {
            PackItem::Delta(delta) => Some(delta),
            _ => None,
        })
    }

    /// Delta manifest for this pack's deltas, named after `from` and `to`
    pub fn delta_manifest(&self, format: u32, new: &Manifest) -> Option<Manifest> {
        delta_manifest(format, self.from, self.to, new, self.deltas())
    }

    /// Encode with zstd at `level`
    pub fn encode(&self, level: i32) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_all(PACK_MAGIC)?;
        out.write_all(&PACK_VERSION.to_le_bytes())?;

        let mut encoder =
            ZstdEncoder::new(out, level).map_err(|e| MixerError::Codec(e.to_string()))?;
        bincode::serialize_into(&mut encoder, self)?;
        encoder
            .finish()
            .map_err(|e| MixerError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header_len = PACK_MAGIC.len() + 2;
        if bytes.len() < header_len || &bytes[..PACK_MAGIC.len()] != PACK_MAGIC {
            return Err(MixerError::Codec("not a mixer pack".to_string()));
        }

        let version = u16::from_le_bytes([bytes[8], bytes[9]]);
        if version != PACK_VERSION {
            return Err(MixerError::Codec(format!(
                "unsupported pack version (expected {}, found {})",
                PACK_VERSION, version
            )));
        }

        let decoder = ZstdDecoder::new(&bytes[header_len..])
            .map_err(|e| MixerError::Codec(e.to_string()))?;
        Ok(bincode::deserialize_from(decoder)?)
    }
}

/// Combine deltas and other items into a pack, sorted by path
pub fn assemble_pack(
    bundle: &str,
    from: u32,
    to: u32,
    deltas: Vec<Delta>,
    items: Vec<PackItem>,
) -> Result<Pack> {
    if to <= from {
        return Err(MixerError::Validation(format!(
            "{}: pack target {} is not newer than {}",
            bundle, to, from
        )));
    }

    let mut items: Vec<PackItem> = deltas.into_iter().map(PackItem::Delta).chain(items).collect();
    items.sort_by(|a, b| a.path().cmp(b.path()));
    for pair in items.windows(2) {
        if pair[0].path() == pair[1].path() {
            return Err(MixerError::Validation(format!(
                "{}: {} appears twice in pack",
                bundle,
                pair[0].path()
            )));
        }
    }

    Ok(Pack {
        bundle: bundle.to_string(),
        from,
        to,
        items,
    })
}

/// Whole-content item for `entry`, verified against its digest
fn full_item(content: &dyn ContentAccessor, entry: &FileEntry) -> Result<PackItem> {
    let bytes = if entry.flags.file_type == FileType::Link {
        let target = content.read_link(entry.version, &entry.name)?;
        let actual = Digest::of(&target);
        if actual != entry.hash {
            return Err(MixerError::ChecksumMismatch {
                expected: entry.hash.to_hex(),
                actual: actual.to_hex(),
            });
        }
        target
    } else {
        read_verified(content, entry)?
    };

    Ok(PackItem::Full {
        path: entry.name.clone(),
        version: entry.version,
        file_type: entry.flags.file_type,
        content: bytes,
    })
}

/// Build the pack taking `old` (or nothing, for a zero pack) to `new`.
///
/// Also returns the delta manifest listing the entries that have deltas,
/// when there are any.
pub fn build_pack(
    format: u32,
    old: Option<&Manifest>,
    new: &Manifest,
    content: &dyn ContentAccessor,
    policy: &DeltaPolicy,
) -> Result<(Pack, Option<Manifest>)> {
    let from = match old {
        Some(old) => {
            check_transition(old, new)?;
            old.header.version
        }
        None => 0,
    };
    let to = new.header.version;

    let deltas = match old {
        Some(old) => build_deltas(format, old, new, content, policy)?,
        None => Vec::new(),
    };
    let delta_count = deltas.len();

    let mut items = Vec::new();
    for entry in new.files.iter().filter(|e| e.version > from) {
        if deltas.iter().any(|d| d.path == entry.name) {
            continue;
        }
        let item = if entry.is_deleted() {
            // Nothing to remove on a fresh install.
            if from == 0 {
                continue;
            }
            PackItem::Tombstone {
                path: entry.name.clone(),
                version: entry.version,
            }
        } else if entry.is_directory() {
            PackItem::Directory {
                path: entry.name.clone(),
                version: entry.version,
            }
        } else {
            full_item(content, entry)?
        };
        items.push(item);
    }

    if let Some(old) = old {
        for gone in old
            .files
            .iter()
            .filter(|e| !e.is_deleted() && new.find(&e.name).is_none())
        {
            items.push(PackItem::Tombstone {
                path: gone.name.clone(),
                version: to,
            });
        }
    }

    let pack = assemble_pack(&new.name, from, to, deltas, items)?;
    let delta_manifest = pack.delta_manifest(format, new);

    info!(
        bundle = %pack.bundle,
        from,
        to,
        items = pack.items.len(),
        deltas = delta_count,
        "built pack"
    );
    Ok((pack, delta_manifest))
}

/// Manifest of the `new` entries that have deltas, updating `from` to `to`.
///
/// Entry sizes come from the deltas' output length, so the content size is
/// right even when `new` was read back from its text form.
pub fn delta_manifest<'a>(
    format: u32,
    from: u32,
    to: u32,
    new: &Manifest,
    deltas: impl IntoIterator<Item = &'a Delta>,
) -> Option<Manifest> {
    let sizes: BTreeMap<&str, u64> = deltas
        .into_iter()
        .map(|d| (d.path.as_str(), d.output_len()))
        .collect();
    if sizes.is_empty() {
        return None;
    }

    let mut manifest = Manifest::new(
        new.name.clone(),
        ManifestHeader {
            format,
            version: to,
            previous: from,
            timestamp: new.header.timestamp,
            min_version: new.header.min_version,
            ..Default::default()
        },
    );
    manifest.files = new
        .files
        .iter()
        .filter_map(|e| {
            sizes.get(e.name.as_str()).map(|&size| FileEntry {
                size,
                ..e.clone()
            })
        })
        .collect();
    manifest.sort_files();
    manifest.update_totals();

    debug!(
        bundle = %manifest.name,
        from,
        entries = manifest.header.file_count,
        "built delta manifest"
    );
    Some(manifest)
}
