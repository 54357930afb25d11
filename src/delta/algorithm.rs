/*!
 * Delta algorithm - rsync-style block matching
 *
 * 1. Sign fixed-size blocks of the old content
 * 2. Slide a rolling checksum over the new content looking for those blocks
 * 3. Emit Copy instructions for matches and Data instructions for the rest
 */

use std::collections::HashMap;

use super::checksum::{calculate_strong_hash, RollingChecksum};
use super::types::{BlockSignature, DeltaInstruction, DeltaStats};
use crate::error::{MixerError, Result};

/// Index of block signatures for fast lookup
#[derive(Clone)]
pub struct SignatureIndex {
    /// Weak hash to the signatures sharing it
    weak_hash_map: HashMap<u32, Vec<BlockSignature>>,

    block_size: usize,
}

impl SignatureIndex {
    pub fn new(signatures: Vec<BlockSignature>, block_size: usize) -> Self {
        let mut weak_hash_map: HashMap<u32, Vec<BlockSignature>> = HashMap::new();
        for sig in signatures {
            weak_hash_map.entry(sig.weak_hash).or_default().push(sig);
        }

        Self {
            weak_hash_map,
            block_size,
        }
    }

    /// Find the block matching both hashes
    pub fn find_match(&self, weak_hash: u32, strong_hash: &[u8; 32]) -> Option<&BlockSignature> {
        self.weak_hash_map
            .get(&weak_hash)?
            .iter()
            .find(|sig| &sig.strong_hash == strong_hash)
    }

    fn has_weak(&self, weak_hash: u32) -> bool {
        self.weak_hash_map.contains_key(&weak_hash)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_empty(&self) -> bool {
        self.weak_hash_map.is_empty()
    }
}

/// Compute the instructions rebuilding `new` from the content behind `index`
pub fn generate_delta(new: &[u8], index: &SignatureIndex) -> (Vec<DeltaInstruction>, DeltaStats) {
    let block_size = index.block_size();
    let mut instructions = Vec::new();
    let mut stats = DeltaStats::default();

    if new.is_empty() {
        return (instructions, stats);
    }

    let mut pos = 0usize;
    let mut dest_offset = 0u64;
    // Start of the current unmatched span, emitted as one Data instruction.
    let mut pending_start = 0usize;
    let mut rolling: Option<RollingChecksum> = None;

    while block_size > 0 && !index.is_empty() && pos + block_size <= new.len() {
        let window = &new[pos..pos + block_size];
        let weak_hash = match rolling.as_mut() {
            Some(roll) => {
                roll.roll(new[pos - 1], new[pos + block_size - 1]);
                roll.checksum()
            }
            None => {
                let roll = RollingChecksum::from_data(window);
                let weak = roll.checksum();
                rolling = Some(roll);
                weak
            }
        };

        if index.has_weak(weak_hash) {
            let strong_hash = calculate_strong_hash(window);
            if let Some(sig) = index.find_match(weak_hash, &strong_hash) {
                if pos > pending_start {
                    let bytes = new[pending_start..pos].to_vec();
                    let len = bytes.len() as u64;
                    instructions.push(DeltaInstruction::Data { dest_offset, bytes });
                    dest_offset += len;
                    stats.bytes_literal += len;
                }

                instructions.push(DeltaInstruction::Copy {
                    src_offset: sig.offset,
                    dest_offset,
                    length: sig.length,
                });

                dest_offset += sig.length as u64;
                pos += sig.length;
                pending_start = pos;
                stats.blocks_matched += 1;
                stats.bytes_reused += sig.length as u64;

                // Restart the window after the matched block.
                rolling = None;
                continue;
            }
        }

        pos += 1;
    }

    if pending_start < new.len() {
        let bytes = new[pending_start..].to_vec();
        stats.bytes_literal += bytes.len() as u64;
        instructions.push(DeltaInstruction::Data { dest_offset, bytes });
    }

    (instructions, stats)
}

/// Rebuild new content from `old` and a list of instructions
pub fn reconstruct(old: &[u8], instructions: &[DeltaInstruction]) -> Result<Vec<u8>> {
    let mut total: u64 = 0;
    let mut literal: u64 = 0;
    for instruction in instructions {
        total = total
            .checked_add(instruction.output_len())
            .ok_or_else(|| MixerError::Codec("delta output length overflows".to_string()))?;
        if let DeltaInstruction::Data { bytes, .. } = instruction {
            literal = literal.saturating_add(bytes.len() as u64);
        }
    }
    // Declared lengths are untrusted until each copy is bounds-checked.
    let reserve = total.min((old.len() as u64).saturating_add(literal));
    let mut out = Vec::with_capacity(usize::try_from(reserve).unwrap_or(0));

    for instruction in instructions {
        let dest_offset = match instruction {
            DeltaInstruction::Copy { dest_offset, .. }
            | DeltaInstruction::Data { dest_offset, .. } => *dest_offset,
        };
        if dest_offset != out.len() as u64 {
            return Err(MixerError::Codec(format!(
                "instruction writes at offset {} but {} bytes were produced",
                dest_offset,
                out.len()
            )));
        }

        match instruction {
            DeltaInstruction::Copy {
                src_offset, length, ..
            } => {
                let start = usize::try_from(*src_offset).map_err(|_| {
                    MixerError::Codec(format!("copy offset {} too large", src_offset))
                })?;
                let block = start
                    .checked_add(*length)
                    .and_then(|end| old.get(start..end))
                    .ok_or_else(|| {
                        MixerError::Codec(format!(
                            "copy of {} bytes at {} outside old content of {} bytes",
                            length,
                            src_offset,
                            old.len()
                        ))
                    })?;
                out.extend_from_slice(block);
            }
            DeltaInstruction::Data { bytes, .. } => out.extend_from_slice(bytes),
        }
    }

    Ok(out)
}
