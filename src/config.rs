/*!
 * Configuration types for mixer
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MixerError, Result};

/// Files smaller than this are shipped whole instead of as binary deltas
pub const MINIMUM_SIZE_TO_MAKE_DELTA: u64 = 200;

/// Block size of the rolling-checksum delta matcher
pub const DEFAULT_DELTA_BLOCK_SIZE: usize = 1024;

/// Main configuration for a mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixConfig {
    /// Directory holding `image/` inputs and `www/` outputs
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// On-disk manifest format to emit
    #[serde(default = "default_format")]
    pub format: u32,

    /// Bundles to build besides os-core
    #[serde(default)]
    pub bundles: Vec<String>,

    /// Oldest version clients may update from (0 = unset)
    #[serde(default)]
    pub min_version: u32,

    /// Minimum new-file size for which a binary delta is computed
    #[serde(default = "default_delta_min_size")]
    pub delta_min_size: u64,

    /// Block size for delta signatures
    #[serde(default = "default_delta_block_size")]
    pub delta_block_size: usize,

    /// Zstd level for packs
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    /// Worker threads for per-bundle tasks (0 = one per CPU)
    #[serde(default)]
    pub workers: usize,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            format: default_format(),
            bundles: Vec::new(),
            min_version: 0,
            delta_min_size: default_delta_min_size(),
            delta_block_size: default_delta_block_size(),
            compression_level: default_compression_level(),
            workers: 0,
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_format() -> u32 {
    1
}

fn default_delta_min_size() -> u64 {
    MINIMUM_SIZE_TO_MAKE_DELTA
}

fn default_delta_block_size() -> usize {
    DEFAULT_DELTA_BLOCK_SIZE
}

fn default_compression_level() -> i32 {
    3
}

impl MixConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MixerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: MixConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| MixerError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.format == 0 {
            return Err(MixerError::Config("format must be at least 1".to_string()));
        }
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(MixerError::Config(format!(
                "compression_level {} outside {}..={}",
                self.compression_level,
                levels.start(),
                levels.end()
            )));
        }
        if self.delta_block_size == 0 {
            return Err(MixerError::Config(
                "delta_block_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Bundles to build: the configured list plus os-core, sorted and deduplicated
    pub fn all_bundles(&self) -> Vec<String> {
        let mut bundles = self.bundles.clone();
        bundles.push(mixer_core_manifest::OS_CORE.to_string());
        bundles.sort();
        bundles.dedup();
        bundles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MixConfig::default();
        assert_eq!(config.delta_min_size, 200);
        assert_eq!(config.min_version, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: MixConfig = toml::from_str(
            r#"
            state_dir = "/srv/mix"
            format = 26
            bundles = ["test-bundle"]
            min_version = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.format, 26);
        assert_eq!(config.min_version, 20);
        assert_eq!(config.delta_block_size, DEFAULT_DELTA_BLOCK_SIZE);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_validation() {
        let config = MixConfig {
            format: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MixConfig {
            compression_level: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_all_bundles_includes_os_core() {
        let config = MixConfig {
            bundles: vec!["zeta".to_string(), "os-core".to_string(), "alpha".to_string()],
            ..Default::default()
        };
        assert_eq!(config.all_bundles(), vec!["alpha", "os-core", "zeta"]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixer.toml");
        let config = MixConfig {
            format: 27,
            bundles: vec!["editors".to_string()],
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(MixConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }
}
