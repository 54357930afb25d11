//! Format policy
//!
//! Every manifest carries a numeric on-disk format. Optional manifest features
//! are only legal from the format that introduced them onwards; this module is
//! the single place that knows those introduction points.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Format that introduced the minversion header, iterative and delta
/// manifests, and fixed the content size overflow.
pub const FORMAT_26: u32 = 26;

/// Format that introduced experimental bundle status on MoM entries.
pub const FORMAT_27: u32 = 27;

/// The one format whose clients mis-parse large content sizes.
pub const BROKEN_CONTENT_SIZE_FORMAT: u32 = 25;

/// Optional manifest features gated by format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// `minversion:` header line
    MinVersionHeader,
    /// `Manifest.<bundle>.I.<from>` iterative manifests
    IterativeManifest,
    /// Binary deltas and `Manifest.<bundle>.D.<from>` delta manifests
    DeltaManifest,
    /// Content size may be emitted without clamping
    ContentSizeOverflowSafe,
    /// Experimental status flag on MoM bundle entries
    ExperimentalBundleStatus,
}

impl Feature {
    /// All features, in introduction order
    pub const ALL: [Feature; 5] = [
        Feature::MinVersionHeader,
        Feature::IterativeManifest,
        Feature::DeltaManifest,
        Feature::ContentSizeOverflowSafe,
        Feature::ExperimentalBundleStatus,
    ];

    /// Stable name used in logs and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::MinVersionHeader => "minversion-header",
            Feature::IterativeManifest => "iterative-manifest",
            Feature::DeltaManifest => "delta-manifest",
            Feature::ContentSizeOverflowSafe => "contentsize-overflow-safe",
            Feature::ExperimentalBundleStatus => "experimental-bundle-status",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown feature: {}", s)))
    }
}

/// Format in which a feature first became legal
pub fn introduced_in(feature: Feature) -> u32 {
    match feature {
        Feature::MinVersionHeader
        | Feature::IterativeManifest
        | Feature::DeltaManifest
        | Feature::ContentSizeOverflowSafe => FORMAT_26,
        Feature::ExperimentalBundleStatus => FORMAT_27,
    }
}

/// Whether `feature` may be emitted in a manifest of the given format.
///
/// Overflow safety is not monotonic: only format 25 is affected, formats
/// before it never had the bug.
pub fn supports(format: u32, feature: Feature) -> bool {
    match feature {
        Feature::ContentSizeOverflowSafe => format != BROKEN_CONTENT_SIZE_FORMAT,
        _ => format >= introduced_in(feature),
    }
}

/// Features supported at `format`
pub fn supported_features(format: u32) -> Vec<Feature> {
    Feature::ALL
        .into_iter()
        .filter(|feature| supports(format, *feature))
        .collect()
}
