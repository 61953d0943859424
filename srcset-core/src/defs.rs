use std::collections::BTreeMap;

use serde::Deserialize;
use srcset_cfg::Config;

use crate::conventions::{Language, UnitKind};

pub static BUILD_FILENAME: Config<&'static str> = Config::new(
    "build_filename",
    "The filename of the build definition at the root of a workspace.",
    "BUILD.srcset.toml",
);

/// Definition of every build unit in a [`Workspace`], parsed from a [`BUILD_FILENAME`].
///
/// [`Workspace`]: crate::Workspace
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    /// Build units keyed by name.
    #[serde(default)]
    pub units: BTreeMap<String, UnitSpec>,
}

impl BuildSpec {
    pub fn from_toml(raw: &str) -> Result<Self, anyhow::Error> {
        let spec = toml::from_str(raw)?;
        Ok(spec)
    }
}

/// A single application or library.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub kind: UnitKind,
    pub language: Language,
    /// Overrides for conventional source sets, or additional custom ones.
    #[serde(default)]
    pub sources: BTreeMap<String, SourcesSpec>,
}

/// Where a source set finds its files, unset fields fall back to the convention.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesSpec {
    /// Root directory, relative to the workspace root.
    pub root: Option<String>,
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_parse() {
        let raw = r#"
            [units.app]
            kind = "application"
            language = "c"

            [units.app.sources.c]
            root = "srcs"
            include = ["**/*.c"]

            [units.app.sources.private-headers]
            root = "hdrs"
            exclude = ["internal/**"]

            [units.greeter]
            kind = "library"
            language = "objective-cpp"
        "#;
        let spec = BuildSpec::from_toml(raw).unwrap();

        let app = &spec.units["app"];
        assert_eq!(app.kind, UnitKind::Application);
        assert_eq!(app.language, Language::C);
        assert_eq!(app.sources["c"].root.as_deref(), Some("srcs"));
        assert_eq!(
            app.sources["c"].include.as_deref(),
            Some(&["**/*.c".to_string()][..])
        );
        let headers = &app.sources["private-headers"];
        assert!(headers.include.is_none());
        assert_eq!(headers.exclude, ["internal/**"]);

        let greeter = &spec.units["greeter"];
        assert_eq!(greeter.kind, UnitKind::Library);
        assert_eq!(greeter.language, Language::ObjectiveCpp);
        assert!(greeter.sources.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"
            [units.app]
            kind = "application"
            language = "c"
            flavor = "debug"
        "#;
        assert!(BuildSpec::from_toml(raw).is_err());

        let raw = r#"
            [units.app]
            kind = "plugin"
            language = "c"
        "#;
        assert!(BuildSpec::from_toml(raw).is_err());
    }

    #[test]
    fn empty_file_has_no_units() {
        assert!(BuildSpec::from_toml("").unwrap().units.is_empty());
    }
}
