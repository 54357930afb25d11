/*!
 * Immutable per-version build context
 */

use mixer_core_manifest::{supports, Feature};

use crate::error::{MixerError, Result};

/// Settings shared read-only by every task building one version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildContext {
    /// Format of every manifest produced for this version
    pub format: u32,

    /// Version being built
    pub version: u32,

    /// Previously built version (previous MoM), 0 for the first build
    pub previous: u32,

    /// Oldest version clients may update from, 0 = unset
    pub min_version: u32,

    /// Unix seconds written into every manifest header
    pub timestamp: i64,
}

impl BuildContext {
    /// Create a context, rejecting impossible version orderings
    pub fn new(format: u32, version: u32, previous: u32, min_version: u32) -> Result<Self> {
        let ctx = Self {
            format,
            version,
            previous,
            min_version,
            timestamp: chrono::Utc::now().timestamp(),
        };
        ctx.validate()?;
        Ok(ctx)
    }

    /// Use a fixed timestamp (reproducible builds, tests)
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.format == 0 {
            return Err(MixerError::Validation("format must be non-zero".to_string()));
        }
        if self.version == 0 {
            return Err(MixerError::Validation("version must be non-zero".to_string()));
        }
        if self.previous >= self.version {
            return Err(MixerError::Validation(format!(
                "version {} must be newer than previous version {}",
                self.version, self.previous
            )));
        }
        if self.min_version > self.version {
            return Err(MixerError::Validation(format!(
                "minversion {} is newer than version {}",
                self.min_version, self.version
            )));
        }
        Ok(())
    }

    /// Whether this build's format allows `feature`
    pub fn supports(&self, feature: Feature) -> bool {
        supports(self.format, feature)
    }

    /// Value of the `minversion` header, or None when it must be omitted
    pub fn header_min_version(&self) -> Option<u32> {
        (self.supports(Feature::MinVersionHeader) && self.min_version != 0)
            .then_some(self.min_version)
    }
}
