//! Core manifest data structures for mixer
//!
//! This crate holds the on-disk manifest model shared by every build step and
//! the policy deciding which manifest features each format may carry.
//!
//! # Key Concepts
//!
//! - **Format**: integer schema version; [`format::supports`] gates optional features
//! - **Manifest**: header plus name-sorted file entries, stored as tab-separated text
//! - **MoM**: the manifest of manifests, one per release version
//!
//! # Example
//!
//! ```
//! use mixer_core_manifest::{supports, Feature, clamp_content_size, BAD_MAX};
//!
//! assert!(!supports(25, Feature::MinVersionHeader));
//! assert!(supports(26, Feature::IterativeManifest));
//! assert_eq!(clamp_content_size(25, BAD_MAX), BAD_MAX - 1);
//! ```

pub mod bundle;
pub mod codec;
pub mod digest;
pub mod error;
pub mod file;
pub mod flags;
pub mod format;
pub mod manifest;
pub mod size;
pub mod validate;

// Re-export main types for convenience
pub use bundle::{BundleHeader, BundleStatus, OS_CORE};
pub use digest::Digest;
pub use error::{Error, Result};
pub use file::FileEntry;
pub use flags::{FileModifier, FileStatus, FileType, Flags};
pub use format::{introduced_in, supported_features, supports, Feature};
pub use manifest::{
    delta_name, iterative_name, manifest_file_name, Manifest, ManifestHeader, MOM_NAME,
};
pub use size::{clamp_content_size, BAD_MAX};
pub use validate::validate_manifest;
