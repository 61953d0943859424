//! Build units of a workspace and the files each of their source sets resolve to.
//!
//! A workspace is a directory with a [`BUILD_FILENAME`](defs::BUILD_FILENAME) at its root that
//! defines applications and libraries. Every unit gets the conventional source sets for its
//! language, see [`conventions`], which the build file can override or add to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use compact_str::CompactString;
use derivative::Derivative;
use srcset_cfg::{ConfigSet, ConfigSetBuilder};
use srcset_resolver::{ResolveError, ResolveOptions, ResolveWorker};
use srcset_types::{ResolvedSourceSet, SourceSetName};
use srcset_watch::WatchedSourceSets;

pub mod cfgs;
pub mod conventions;
pub mod defs;
pub mod unit;

use crate::defs::{BuildSpec, BUILD_FILENAME};
use crate::unit::{BuildUnit, UnitSourceSet};

/// Register every [`Config`](srcset_cfg::Config) this crate reads.
pub fn register_configs(builder: &mut ConfigSetBuilder) {
    builder.register(&BUILD_FILENAME);
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Workspace {
    /// Root directory of the workspace, where the build file lives.
    root_dir: PathBuf,
    /// Every build unit, keyed by name.
    units: BTreeMap<CompactString, BuildUnit>,
    #[derivative(Debug = "ignore")]
    configs: ConfigSet,
    options: ResolveOptions,
    /// Pool that walks the filesystem.
    worker: ResolveWorker,
}

impl Workspace {
    /// Load the workspace rooted at `root` by reading its build file.
    pub fn load(root: impl Into<PathBuf>, configs: ConfigSet) -> Result<Self, anyhow::Error> {
        let root_dir = root.into();
        let build_file = root_dir.join(BUILD_FILENAME.read(&configs).as_str());
        let raw = std::fs::read_to_string(&build_file)
            .with_context(|| format!("reading build file {}", build_file.display()))?;
        let spec = BuildSpec::from_toml(&raw)
            .with_context(|| format!("parsing build file {}", build_file.display()))?;

        tracing::info!(?build_file, num_units = spec.units.len(), "loaded build file");
        Workspace::from_spec(root_dir, &spec, configs)
    }

    /// Create a workspace from an already parsed [`BuildSpec`].
    pub fn from_spec(
        root_dir: PathBuf,
        spec: &BuildSpec,
        configs: ConfigSet,
    ) -> Result<Self, anyhow::Error> {
        let units: BTreeMap<_, _> = spec
            .units
            .iter()
            .map(|(name, unit)| {
                let unit = BuildUnit::from_spec(name, unit, &root_dir)?;
                Ok::<_, anyhow::Error>((CompactString::new(name), unit))
            })
            .collect::<Result<_, _>>()?;
        let options = ResolveOptions::from_configs(&configs);
        let worker = ResolveWorker::from_configs(&configs)?;

        Ok(Workspace {
            root_dir,
            units,
            configs,
            options,
            worker,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn units(&self) -> impl Iterator<Item = &BuildUnit> {
        self.units.values()
    }

    pub fn unit(&self, name: &str) -> Option<&BuildUnit> {
        self.units.get(name)
    }

    fn unit_or_err(&self, name: &str) -> Result<&BuildUnit, anyhow::Error> {
        self.unit(name)
            .ok_or_else(|| anyhow::anyhow!("no build unit named '{name}'"))
    }

    /// Resolve every source set of the unit `name`.
    ///
    /// Source sets are resolved concurrently, a failure in one doesn't affect the others.
    pub async fn resolve_unit(&self, name: &str) -> Result<BuildUnitSources, anyhow::Error> {
        let unit = self.unit_or_err(name)?;
        let specs = unit.specs().cloned().collect();
        let results = self.worker.resolve_all(specs, self.options.clone()).await;

        let sets = unit
            .sets()
            .iter()
            .zip(results)
            .map(|(set, result)| (set.spec().name().clone(), set.settle(result)))
            .collect();
        let sources = BuildUnitSources {
            unit: CompactString::new(unit.name()),
            sets,
        };
        tracing::info!(
            unit = %sources.unit,
            num_files = sources.num_files(),
            num_errors = sources.errors().count(),
            "resolved build unit"
        );

        Ok(sources)
    }

    /// Resolve every unit in the workspace, ordered by unit name.
    pub async fn resolve_all(&self) -> Result<Vec<BuildUnitSources>, anyhow::Error> {
        let units = self.units.keys().map(|name| self.resolve_unit(name));
        futures::future::try_join_all(units).await
    }

    /// Watch the source sets of the unit `name`, every query after a change re-resolves.
    pub fn watch_unit(&self, name: &str) -> Result<WatchedUnit, anyhow::Error> {
        let unit = self.unit_or_err(name)?.clone();
        let cache = Arc::new(unit.cache(&self.options));
        let watched = WatchedSourceSets::from_configs(cache, &self.configs)?;
        Ok(WatchedUnit { unit, watched })
    }
}

/// The outcome of resolving every source set of a [`BuildUnit`].
#[derive(Debug)]
pub struct BuildUnitSources {
    unit: CompactString,
    /// In the same order as [`BuildUnit::specs`].
    sets: Vec<(SourceSetName, Result<ResolvedSourceSet, ResolveError>)>,
}

impl BuildUnitSources {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&SourceSetName, &Result<ResolvedSourceSet, ResolveError>)> {
        self.sets.iter().map(|(name, result)| (name, result))
    }

    pub fn get(&self, name: &SourceSetName) -> Option<&Result<ResolvedSourceSet, ResolveError>> {
        self.sets
            .iter()
            .find(|(set, _)| set == name)
            .map(|(_, result)| result)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ResolveError> {
        self.sets.iter().filter_map(|(_, result)| result.as_ref().err())
    }

    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Total number of files across every set that resolved.
    pub fn num_files(&self) -> usize {
        self.sets
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .map(ResolvedSourceSet::len)
            .sum()
    }
}

/// The source sets of a [`BuildUnit`], kept up to date by watching their roots.
pub struct WatchedUnit {
    unit: BuildUnit,
    watched: WatchedSourceSets,
}

impl WatchedUnit {
    pub fn unit(&self) -> &BuildUnit {
        &self.unit
    }

    /// Return the source set `name`, resolving it if it changed since the last call.
    pub fn get(&self, name: &SourceSetName) -> Option<Result<Arc<ResolvedSourceSet>, ResolveError>> {
        let set: &UnitSourceSet = self.unit.set(name)?;
        let result = self.watched.cache().get(name)?;
        Some(result.or_else(|err| set.recover(err).map(Arc::new)))
    }
}

impl std::fmt::Debug for WatchedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedUnit")
            .field("unit", &self.unit.name())
            .finish()
    }
}

#[cfg(test)]
mod tests;
