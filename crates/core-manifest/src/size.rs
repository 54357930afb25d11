//! Content size guard for the format 25 client bug

use crate::format::{supports, Feature};

/// Format 25 clients reject any content size at or above this value.
pub const BAD_MAX: u64 = 2_000_000_000_000;

/// Clamp an aggregate manifest content size so the target format's clients
/// can read it. Only format 25 clamps; every other format is returned as is.
pub fn clamp_content_size(format: u32, size: u64) -> u64 {
    if !supports(format, Feature::ContentSizeOverflowSafe) && size >= BAD_MAX {
        BAD_MAX - 1
    } else {
        size
    }
}
