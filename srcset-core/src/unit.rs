//! Build units and the source sets that feed them.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use srcset_resolver::{ResolveError, ResolveOptions, SourceSetCache};
use srcset_types::{InvalidName, ResolvedSourceSet, SourceSetName, SourceSetSpec};

use crate::conventions::{conventions, Language, UnitKind};
use crate::defs::{SourcesSpec, UnitSpec};

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("invalid name in unit '{unit}': {source}")]
    InvalidName {
        unit: CompactString,
        #[source]
        source: InvalidName,
    },
    #[error("custom source set '{set}' of unit '{unit}' must set `{field}`")]
    MissingField {
        unit: CompactString,
        set: SourceSetName,
        field: &'static str,
    },
    #[error("source set '{set}' is not supported by {language} {kind} '{unit}'")]
    Unsupported {
        unit: CompactString,
        set: SourceSetName,
        language: Language,
        kind: &'static str,
    },
}

/// An application or library along with its source sets.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    name: CompactString,
    kind: UnitKind,
    language: Language,
    /// In resolution order: conventional sets first, then custom sets by name.
    sets: Vec<UnitSourceSet>,
}

/// A source set of a [`BuildUnit`].
#[derive(Debug, Clone)]
pub struct UnitSourceSet {
    spec: SourceSetSpec,
    /// The root came from a convention rather than the build file, so it's fine if it doesn't
    /// exist.
    conventional_root: bool,
}

impl UnitSourceSet {
    pub fn spec(&self) -> &SourceSetSpec {
        &self.spec
    }

    pub fn has_conventional_root(&self) -> bool {
        self.conventional_root
    }

    /// Treat a missing conventional root as an empty set.
    pub fn settle(
        &self,
        result: Result<ResolvedSourceSet, ResolveError>,
    ) -> Result<ResolvedSourceSet, ResolveError> {
        result.or_else(|err| self.recover(err))
    }

    /// Recover from `err` if it only means the conventional root hasn't been created.
    pub fn recover(&self, err: ResolveError) -> Result<ResolvedSourceSet, ResolveError> {
        match err {
            ResolveError::NotFound { name, root } if self.conventional_root => {
                tracing::debug!(%name, ?root, "conventional root does not exist");
                let root = std::path::absolute(&root).unwrap_or(root);
                let fingerprint = srcset_ore::hash::fingerprint_seq(std::iter::empty::<&[u8]>());
                Ok(ResolvedSourceSet::new(name, root, Vec::new(), fingerprint))
            }
            err => Err(err),
        }
    }
}

impl BuildUnit {
    /// Build a unit from its definition, roots are relative to `base_dir`.
    pub fn from_spec(name: &str, spec: &UnitSpec, base_dir: &Path) -> Result<Self, DefinitionError> {
        let unit = CompactString::new(name);
        let mut overrides = Vec::with_capacity(spec.sources.len());
        for (set_name, sources) in &spec.sources {
            let set_name =
                SourceSetName::new(set_name).map_err(|source| DefinitionError::InvalidName {
                    unit: unit.clone(),
                    source,
                })?;
            overrides.push((set_name, sources));
        }

        let mut sets = Vec::new();
        for convention in conventions(spec.kind, spec.language) {
            let sources = overrides
                .iter()
                .position(|(name, _)| *name == convention.name)
                .map(|idx| overrides.remove(idx).1);

            let (root, conventional_root) = match sources.and_then(|s| s.root.as_deref()) {
                Some(root) => (base_dir.join(root), false),
                None => (base_dir.join(convention.root), true),
            };
            let builder = SourceSetSpec::builder(convention.name, root);
            let builder = match sources.and_then(|s| s.include.as_ref()) {
                Some(include) => builder.includes(include.iter().map(String::as_str)),
                None => builder.includes(convention.include.iter().copied()),
            };
            let builder = match sources {
                Some(sources) => builder.excludes(sources.exclude.iter().map(String::as_str)),
                None => builder,
            };

            sets.push(UnitSourceSet {
                spec: builder.build(),
                conventional_root,
            });
        }

        // Whatever is left didn't match a convention.
        for (set_name, sources) in overrides {
            sets.push(custom_set(&unit, spec, set_name, sources, base_dir)?);
        }

        Ok(BuildUnit {
            name: unit,
            kind: spec.kind,
            language: spec.language,
            sets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn sets(&self) -> &[UnitSourceSet] {
        &self.sets[..]
    }

    /// Specs of every source set, in resolution order.
    pub fn specs(&self) -> impl Iterator<Item = &SourceSetSpec> {
        self.sets.iter().map(UnitSourceSet::spec)
    }

    pub fn set(&self, name: &SourceSetName) -> Option<&UnitSourceSet> {
        self.sets.iter().find(|set| set.spec.name() == name)
    }

    /// A lazily resolved cache over every source set in this unit.
    pub fn cache(&self, options: &ResolveOptions) -> SourceSetCache {
        SourceSetCache::from_specs(self.specs().cloned(), options)
    }
}

fn custom_set(
    unit: &CompactString,
    spec: &UnitSpec,
    name: SourceSetName,
    sources: &SourcesSpec,
    base_dir: &Path,
) -> Result<UnitSourceSet, DefinitionError> {
    // Header sets the unit doesn't support, rather than silently treating them as custom.
    let is_header_set =
        name == crate::conventions::PRIVATE_HEADERS || name == crate::conventions::PUBLIC_HEADERS;
    let is_language_set = [
        Language::C,
        Language::Cpp,
        Language::ObjectiveC,
        Language::ObjectiveCpp,
        Language::Swift,
    ]
    .iter()
    .any(|language| language.source_set() == name);
    if is_header_set || is_language_set {
        let kind = match spec.kind {
            UnitKind::Application => "application",
            UnitKind::Library => "library",
        };
        return Err(DefinitionError::Unsupported {
            unit: unit.clone(),
            set: name,
            language: spec.language,
            kind,
        });
    }

    let missing = |field| DefinitionError::MissingField {
        unit: unit.clone(),
        set: name.clone(),
        field,
    };
    let root: PathBuf = base_dir.join(sources.root.as_deref().ok_or_else(|| missing("root"))?);
    let include = sources.include.as_ref().ok_or_else(|| missing("include"))?;

    let spec = SourceSetSpec::builder(name, root)
        .includes(include.iter().map(String::as_str))
        .excludes(sources.exclude.iter().map(String::as_str))
        .build();
    Ok(UnitSourceSet {
        spec,
        conventional_root: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::BuildSpec;

    fn unit(raw: &str, name: &str) -> Result<BuildUnit, DefinitionError> {
        let spec = BuildSpec::from_toml(raw).unwrap();
        BuildUnit::from_spec(name, &spec.units[name], Path::new("/work"))
    }

    type Summary = Vec<(String, PathBuf, Vec<String>, Vec<String>)>;

    fn summary(unit: &BuildUnit) -> Summary {
        unit.specs()
            .map(|spec| {
                (
                    spec.name().to_string(),
                    spec.root_directory().to_path_buf(),
                    spec.include_patterns().iter().map(|p| p.to_string()).collect(),
                    spec.exclude_patterns().iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn conventions_fill_in_missing_sets() {
        let unit = unit(
            r#"
            [units.greeter]
            kind = "library"
            language = "c"
            "#,
            "greeter",
        )
        .unwrap();

        assert_eq!(unit.name(), "greeter");
        let expected: Summary = vec![
            ("c".into(), "/work/src/main/c".into(), vec!["**/*.c".into()], vec![]),
            (
                "private-headers".into(),
                "/work/src/main/headers".into(),
                vec!["**/*.h".into()],
                vec![]
            ),
            (
                "public-headers".into(),
                "/work/src/main/public".into(),
                vec!["**/*.h".into()],
                vec![]
            ),
        ];
        assert_eq!(summary(&unit), expected);
        assert!(unit.sets().iter().all(UnitSourceSet::has_conventional_root));
    }

    #[test]
    fn overrides_and_custom_sets() {
        let unit = unit(
            r#"
            [units.app]
            kind = "application"
            language = "objective-c"

            [units.app.sources.objective-c]
            root = "srcs"
            include = ["**/*.m"]
            exclude = ["**/*Test.m"]

            [units.app.sources.private-headers]
            root = "hdrs"

            [units.app.sources.assets]
            root = "res"
            include = ["**/*.png"]
            "#,
            "app",
        )
        .unwrap();

        let expected: Summary = vec![
            (
                "objective-c".into(),
                "/work/srcs".into(),
                vec!["**/*.m".into()],
                vec!["**/*Test.m".into()]
            ),
            (
                "private-headers".into(),
                "/work/hdrs".into(),
                vec!["**/*.h".into()],
                vec![]
            ),
            ("assets".into(), "/work/res".into(), vec!["**/*.png".into()], vec![]),
        ];
        assert_eq!(summary(&unit), expected);
        assert!(unit.sets().iter().all(|set| !set.has_conventional_root()));
        assert!(unit.set(&SourceSetName::const_new("assets")).is_some());
    }

    #[test]
    fn applications_reject_public_headers() {
        let err = unit(
            r#"
            [units.app]
            kind = "application"
            language = "c"

            [units.app.sources.public-headers]
            root = "incs"
            "#,
            "app",
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::Unsupported { .. }), "{err}");
        assert_eq!(
            err.to_string(),
            "source set 'public-headers' is not supported by c application 'app'"
        );
    }

    #[test]
    fn custom_sets_need_root_and_include() {
        let err = unit(
            r#"
            [units.app]
            kind = "application"
            language = "c"

            [units.app.sources.assets]
            root = "res"
            "#,
            "app",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::MissingField { field: "include", .. }
        ));

        let err = unit(
            r#"
            [units.app]
            kind = "application"
            language = "c"

            [units.app.sources."bad name"]
            root = "res"
            "#,
            "app",
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidName { .. }));
    }
}
