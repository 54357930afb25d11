/*!
 * Mixer - format-gated manifest generation, diffing and packing
 *
 * Builds the update content clients consume:
 * - Bundle manifests with carried-forward file versions
 * - Iterative manifests listing only what changed
 * - Binary deltas and packs between two versions
 * - The manifest of manifests (MoM) for each version
 *
 * Which optional manifest features may be written is decided per format by
 * `mixer_core_manifest::format`.
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod builder;
pub mod cli_style;
pub mod config;
pub mod content;
pub mod context;
pub mod delta;
pub mod error;
pub mod iterative;
pub mod layout;
pub mod logging;
pub mod mix;
pub mod mom;
pub mod pack;
pub mod scan;

// Re-export commonly used types
pub use builder::{build_manifest, carry_forward, BundleManifest};
pub use config::{LogLevel, MixConfig};
pub use content::{ContentAccessor, ImageContent, MemoryContent};
pub use context::BuildContext;
pub use delta::{apply_delta, build_deltas, Delta, DeltaPolicy};
pub use error::{MixerError, Result};
pub use iterative::build_iterative;
pub use mix::{BuildSummary, Mix};
pub use mom::{build_mom, ArtifactRef};
pub use pack::{assemble_pack, build_pack, Pack, PackItem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
