/*!
 * Version build driver
 *
 * `Mix` ties the pieces together for one state directory: it scans the
 * bundle trees under `image/<version>`, builds every bundle manifest on the
 * worker pool, assembles the MoM, and only then publishes the results under
 * `www/<version>`, delta manifests included. Pack creation reads the
 * published manifests back.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mixer_core_interface::{LocalStorage, Storage};
use mixer_core_manifest::{FileType, Manifest, MOM_NAME, OS_CORE};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::builder::{build_manifest, carry_forward, is_unchanged, BundleManifest};
use crate::config::MixConfig;
use crate::content::ImageContent;
use crate::context::BuildContext;
use crate::delta::{build_deltas, DeltaPolicy};
use crate::error::{MixerError, Result};
use crate::iterative::build_iterative;
use crate::layout;
use crate::mom::{build_mom, ArtifactRef};
use crate::pack::{assemble_pack, build_pack, delta_manifest, Pack};
use crate::scan::{load_bundle_info, scan_bundle, BundleInfo};

/// What one bundle task produced
#[derive(Debug)]
struct BundleOutcome {
    bundle: BundleManifest,

    /// False when the previous manifest was reused
    changed: bool,

    iterative: Option<Manifest>,

    /// Deltas from the previous version, when any file got one
    delta: Option<Manifest>,
}

/// Summary of a published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub version: u32,
    pub previous: u32,
    pub format: u32,

    /// Bundles that got a new manifest
    pub changed: Vec<String>,

    /// Bundles whose previous manifest was kept
    pub unchanged: Vec<String>,

    /// Bundles that got an iterative manifest
    pub iterative: Vec<String>,

    /// Bundles that got a delta manifest
    pub deltas: Vec<String>,
}

/// Builds versions and packs for one state directory
pub struct Mix<S: Storage> {
    config: MixConfig,
    storage: S,
    content: ImageContent,
    pool: rayon::ThreadPool,
    timestamp: Option<i64>,
}

impl Mix<LocalStorage> {
    /// Mix writing to the configured state directory
    pub fn local(config: MixConfig) -> Result<Self> {
        let storage = LocalStorage::new(config.state_dir.clone());
        Self::new(config, storage)
    }
}

impl<S: Storage> Mix<S> {
    pub fn new(config: MixConfig, storage: S) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| MixerError::Parallel(e.to_string()))?;

        Ok(Self {
            content: ImageContent::new(config.state_dir.clone()),
            config,
            storage,
            pool,
            timestamp: None,
        })
    }

    /// Stamp every manifest with `timestamp` instead of the current time
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    /// Change the format of subsequent builds
    pub fn set_format(&mut self, format: u32) {
        self.config.format = format;
    }

    /// Change the minversion of subsequent builds
    pub fn set_min_version(&mut self, min_version: u32) {
        self.config.min_version = min_version;
    }

    /// Replace the bundles built besides os-core
    pub fn set_bundles(&mut self, bundles: Vec<String>) {
        self.config.bundles = bundles;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn image_path(&self, relative: &Path) -> PathBuf {
        self.config.state_dir.join(relative)
    }

    /// Last built version, 0 before the first build
    pub fn last_version(&self) -> Result<u32> {
        let path = layout::last_version_path();
        if !self.storage.exists(&path) {
            return Ok(0);
        }
        let text = self.storage.read_string(&path)?;
        text.trim().parse::<u32>().map_err(|_| {
            MixerError::Config(format!("{} holds {:?}, not a version", path.display(), text))
        })
    }

    /// Read a published manifest
    pub fn read_manifest(&self, version: u32, name: &str) -> Result<Manifest> {
        let text = self
            .storage
            .read_string(&layout::manifest_path(version, name))?;
        Ok(Manifest::parse(name, &text)?)
    }

    pub fn read_mom(&self, version: u32) -> Result<Manifest> {
        self.read_manifest(version, MOM_NAME)
    }

    /// Manifest of `bundle` referenced by `mom`, if listed
    fn bundle_manifest(&self, mom: &Manifest, bundle: &str) -> Result<Option<Manifest>> {
        match mom
            .find(bundle)
            .filter(|e| e.flags.file_type == FileType::Manifest && !e.is_deleted())
        {
            Some(entry) => Ok(Some(self.read_manifest(entry.version, bundle)?)),
            None => Ok(None),
        }
    }

    fn bundle_info(&self, version: u32, bundle: &str) -> Result<BundleInfo> {
        let path = self.image_path(&layout::bundle_info_path(version, bundle));
        if path.exists() {
            load_bundle_info(&path)
        } else {
            Ok(BundleInfo::default())
        }
    }

    /// Build one bundle's manifest for `ctx.version`
    fn build_bundle(
        &self,
        ctx: &BuildContext,
        bundle: &str,
        old_mom: Option<&Manifest>,
    ) -> Result<BundleOutcome> {
        let info = self.bundle_info(ctx.version, bundle)?;

        let mut includes = Vec::new();
        if bundle != OS_CORE {
            includes.push(OS_CORE.to_string());
        }
        for include in info.includes {
            if include != bundle && !includes.contains(&include) {
                includes.push(include);
            }
        }

        let scanned = scan_bundle(&self.image_path(&layout::bundle_dir(ctx.version, bundle)))?;
        let old = match old_mom {
            Some(mom) => self.bundle_manifest(mom, bundle)?,
            None => None,
        };
        let files = carry_forward(ctx, scanned, old.as_ref());

        if let Some(prev) = old
            .as_ref()
            .filter(|prev| is_unchanged(prev, &files, &includes, ctx.format))
        {
            debug!(bundle, version = prev.header.version, "bundle unchanged");
            return Ok(BundleOutcome {
                bundle: BundleManifest::new(prev.clone(), &info.header, ctx.format),
                changed: false,
                iterative: None,
                delta: None,
            });
        }

        let previous = old.as_ref().map_or(0, |m| m.header.version);
        let built = build_manifest(ctx, bundle, previous, files, includes, &info.header)?;
        let (iterative, delta) = match old.as_ref() {
            Some(old) => {
                let iterative = build_iterative(ctx.format, old, &built.manifest)?;
                let deltas = build_deltas(
                    ctx.format,
                    old,
                    &built.manifest,
                    &self.content,
                    &DeltaPolicy::from(&self.config),
                )?;
                // Named after the MoM versions, like the pack from ctx.previous.
                let delta =
                    delta_manifest(ctx.format, ctx.previous, ctx.version, &built.manifest, &deltas);
                (iterative, delta)
            }
            None => (None, None),
        };

        Ok(BundleOutcome {
            bundle: built,
            changed: true,
            iterative,
            delta,
        })
    }

    /// References for one kind of generated manifest, keyed by bundle
    fn artifacts(
        outcomes: &[BundleOutcome],
        pick: impl Fn(&BundleOutcome) -> Option<&Manifest>,
    ) -> BTreeMap<String, ArtifactRef> {
        outcomes
            .iter()
            .filter_map(|o| pick(o).map(|m| (o.bundle.name().to_string(), ArtifactRef::of(m))))
            .collect()
    }

    /// Build and publish every manifest of `version`.
    ///
    /// Nothing is written unless every bundle builds.
    pub fn create_manifests(&self, version: u32) -> Result<BuildSummary> {
        if self.storage.exists(&layout::mom_path(version)) {
            return Err(MixerError::Validation(format!(
                "version {} is already published",
                version
            )));
        }

        let previous = self.last_version()?;
        let mut ctx = BuildContext::new(
            self.config.format,
            version,
            previous,
            self.config.min_version,
        )?;
        if let Some(timestamp) = self.timestamp {
            ctx = ctx.with_timestamp(timestamp);
        }

        let old_mom = if previous > 0 {
            Some(self.read_mom(previous)?)
        } else {
            None
        };
        if let Some(old) = &old_mom {
            if old.header.format > ctx.format {
                warn!(
                    from = old.header.format,
                    to = ctx.format,
                    "building with an older format than the previous version"
                );
            }
        }

        let bundles = self.config.all_bundles();
        info!(
            version,
            previous,
            format = ctx.format,
            bundles = bundles.len(),
            "building manifests"
        );

        let outcomes: Vec<BundleOutcome> = self.pool.install(|| {
            bundles
                .par_iter()
                .map(|bundle| self.build_bundle(&ctx, bundle, old_mom.as_ref()))
                .collect::<Result<Vec<_>>>()
        })?;

        let iterative = Self::artifacts(&outcomes, |o| o.iterative.as_ref());
        let deltas = Self::artifacts(&outcomes, |o| o.delta.as_ref());
        let manifests: Vec<BundleManifest> = outcomes.iter().map(|o| o.bundle.clone()).collect();
        let mom = build_mom(&ctx, &manifests, &iterative, &deltas)?;

        let mut summary = BuildSummary {
            version,
            previous,
            format: ctx.format,
            changed: Vec::new(),
            unchanged: Vec::new(),
            iterative: iterative.keys().cloned().collect(),
            deltas: deltas.keys().cloned().collect(),
        };

        for outcome in &outcomes {
            let name = outcome.bundle.name();
            if !outcome.changed {
                summary.unchanged.push(name.to_string());
                continue;
            }
            self.storage.write_atomic(
                &layout::manifest_path(version, name),
                &outcome.bundle.manifest.to_bytes(),
            )?;
            if let Some(iter) = &outcome.iterative {
                self.storage.write_atomic(
                    &layout::iterative_path(version, name, iter.header.previous),
                    &iter.to_bytes(),
                )?;
            }
            if let Some(delta) = &outcome.delta {
                self.storage.write_atomic(
                    &layout::delta_manifest_path(version, name, delta.header.previous),
                    &delta.to_bytes(),
                )?;
            }
            summary.changed.push(name.to_string());
        }

        self.storage
            .write_atomic(&layout::mom_path(version), &mom.to_bytes())?;
        let stamp = format!("{}\n", version);
        self.storage
            .write_atomic(&layout::last_version_path(), stamp.as_bytes())?;
        self.storage
            .write_atomic(&layout::latest_path(ctx.format), stamp.as_bytes())?;

        info!(
            version,
            changed = summary.changed.len(),
            unchanged = summary.unchanged.len(),
            iterative = summary.iterative.len(),
            deltas = summary.deltas.len(),
            "published version"
        );
        Ok(summary)
    }

    /// Build and publish the pack taking `bundle` from `from` to `to`.
    ///
    /// `from == 0` builds the full pack. A delta manifest is published next
    /// to the pack when any file got a delta.
    pub fn create_pack(&self, bundle: &str, from: u32, to: u32) -> Result<Pack> {
        if to <= from {
            return Err(MixerError::Validation(format!(
                "{}: pack target {} is not newer than {}",
                bundle, to, from
            )));
        }

        let to_mom = self.read_mom(to)?;
        let new = self.bundle_manifest(&to_mom, bundle)?.ok_or_else(|| {
            MixerError::Validation(format!("bundle {} is not part of version {}", bundle, to))
        })?;
        let old = if from == 0 {
            None
        } else {
            self.bundle_manifest(&self.read_mom(from)?, bundle)?
        };

        let format = to_mom.header.format;
        let mut pack = match &old {
            Some(old) if old.header.version == new.header.version => {
                assemble_pack(bundle, from, to, Vec::new(), Vec::new())?
            }
            _ => {
                build_pack(
                    format,
                    old.as_ref(),
                    &new,
                    &self.content,
                    &DeltaPolicy::from(&self.config),
                )?
                .0
            }
        };
        // Named after the versions the client sees, not the manifest versions.
        pack.from = from;
        pack.to = to;

        if let Some(manifest) = pack.delta_manifest(format, &new) {
            self.storage.write_atomic(
                &layout::delta_manifest_path(to, bundle, from),
                &manifest.to_bytes(),
            )?;
        }
        let bytes = pack.encode(self.config.compression_level)?;
        self.storage
            .write_atomic(&layout::pack_path(to, bundle, from), &bytes)?;

        debug!(bundle, from, to, bytes = bytes.len(), "published pack");
        Ok(pack)
    }

    /// Build packs from `from` to `to` for every bundle of version `to`
    pub fn create_packs(&self, from: u32, to: u32) -> Result<Vec<Pack>> {
        let mom = self.read_mom(to)?;
        let bundles: Vec<&str> = mom
            .files
            .iter()
            .filter(|e| e.flags.file_type == FileType::Manifest && !e.is_deleted())
            .map(|e| e.name.as_str())
            .collect();

        self.pool.install(|| {
            bundles
                .par_iter()
                .map(|bundle| self.create_pack(bundle, from, to))
                .collect()
        })
    }
}
