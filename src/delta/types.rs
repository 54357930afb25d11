/*!
 * Delta data types
 */

use mixer_core_manifest::Digest;
use serde::{Deserialize, Serialize};

/// Signature of one block of the old content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignature {
    /// Block index in the old content
    pub index: u64,

    /// Byte offset of the block
    pub offset: u64,

    /// Block length; only the last block may be shorter than the block size
    pub length: usize,

    /// Adler-32 rolling checksum
    pub weak_hash: u32,

    /// BLAKE3 hash of the block
    pub strong_hash: [u8; 32],
}

/// Instruction for rebuilding the new content from the old one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaInstruction {
    /// Copy a block of the old content
    Copy {
        /// Offset in the old content
        src_offset: u64,
        /// Offset in the new content
        dest_offset: u64,
        /// Number of bytes
        length: usize,
    },

    /// Literal bytes absent from the old content
    Data {
        /// Offset in the new content
        dest_offset: u64,
        /// Raw bytes to insert
        bytes: Vec<u8>,
    },
}

impl DeltaInstruction {
    /// Bytes this instruction contributes to the new content
    pub fn output_len(&self) -> u64 {
        match self {
            DeltaInstruction::Copy { length, .. } => *length as u64,
            DeltaInstruction::Data { bytes, .. } => bytes.len() as u64,
        }
    }
}

/// Binary delta of one file between two manifest versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Entry name (absolute path inside the bundle)
    pub path: String,

    /// Version of the old entry
    pub from_version: u32,

    /// Version of the new entry
    pub to_version: u32,

    /// Digest of the content the delta applies to
    pub from_hash: Digest,

    /// Digest of the content the delta produces
    pub to_hash: Digest,

    pub instructions: Vec<DeltaInstruction>,
}

impl Delta {
    /// Size of the reconstructed content
    pub fn output_len(&self) -> u64 {
        self.instructions.iter().map(DeltaInstruction::output_len).sum()
    }

    /// Literal bytes carried by the delta
    pub fn literal_len(&self) -> u64 {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                DeltaInstruction::Data { bytes, .. } => Some(bytes.len() as u64),
                DeltaInstruction::Copy { .. } => None,
            })
            .sum()
    }
}

/// Statistics for one generated delta
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaStats {
    /// Number of blocks matched in the old content
    pub blocks_matched: u64,

    /// Bytes copied from the old content
    pub bytes_reused: u64,

    /// Bytes carried literally
    pub bytes_literal: u64,
}

impl DeltaStats {
    /// Fraction of the new content reused from the old one
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.bytes_reused + self.bytes_literal;
        if total == 0 {
            0.0
        } else {
            self.bytes_reused as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_lengths() {
        let delta = Delta {
            path: "/foo".to_string(),
            from_version: 10,
            to_version: 20,
            from_hash: Digest::of(b"a"),
            to_hash: Digest::of(b"b"),
            instructions: vec![
                DeltaInstruction::Copy {
                    src_offset: 0,
                    dest_offset: 0,
                    length: 100,
                },
                DeltaInstruction::Data {
                    dest_offset: 100,
                    bytes: vec![1, 2, 3],
                },
            ],
        };
        assert_eq!(delta.output_len(), 103);
        assert_eq!(delta.literal_len(), 3);
    }

    #[test]
    fn test_reuse_ratio() {
        let stats = DeltaStats {
            blocks_matched: 1,
            bytes_reused: 75,
            bytes_literal: 25,
        };
        assert!((stats.reuse_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(DeltaStats::default().reuse_ratio(), 0.0);
    }
}
