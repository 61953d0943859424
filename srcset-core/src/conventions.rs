//! Default source sets for each kind of build unit.
//!
//! Every unit gets a source set for its language and, unless the language has no headers, a
//! `private-headers` set. Libraries additionally export `public-headers`. A set the build file
//! doesn't mention falls back to the conventional root and patterns below.

use std::fmt;

use serde::Deserialize;
use srcset_types::SourceSetName;

pub static PRIVATE_HEADERS: SourceSetName = SourceSetName::const_new("private-headers");
pub static PUBLIC_HEADERS: SourceSetName = SourceSetName::const_new("public-headers");

static C_HEADERS: &[&str] = &["**/*.h"];
static CPP_HEADERS: &[&str] = &["**/*.h", "**/*.hpp", "**/*.hh", "**/*.hxx"];

/// What a build unit produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Application,
    Library,
}

impl UnitKind {
    pub fn has_public_headers(self) -> bool {
        matches!(self, UnitKind::Library)
    }
}

/// Implementation language of a build unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    C,
    Cpp,
    ObjectiveC,
    ObjectiveCpp,
    Swift,
}

impl Language {
    /// Name of the source set holding this language's sources.
    pub fn source_set(self) -> SourceSetName {
        SourceSetName::const_new(self.as_str())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::ObjectiveC => "objective-c",
            Language::ObjectiveCpp => "objective-cpp",
            Language::Swift => "swift",
        }
    }

    /// Directory sources are picked up from when none is configured.
    pub fn default_root(self) -> &'static str {
        match self {
            Language::C => "src/main/c",
            Language::Cpp => "src/main/cpp",
            Language::ObjectiveC => "src/main/objc",
            Language::ObjectiveCpp => "src/main/objcpp",
            Language::Swift => "src/main/swift",
        }
    }

    pub fn default_includes(self) -> &'static [&'static str] {
        match self {
            Language::C => &["**/*.c"],
            Language::Cpp => &["**/*.cpp", "**/*.c++", "**/*.cc", "**/*.cp", "**/*.cxx"],
            Language::ObjectiveC => &["**/*.m"],
            Language::ObjectiveCpp => &["**/*.mm"],
            Language::Swift => &["**/*.swift"],
        }
    }

    /// Patterns for header sets, `None` if the language has no headers.
    pub fn header_includes(self) -> Option<&'static [&'static str]> {
        match self {
            Language::C | Language::ObjectiveC => Some(C_HEADERS),
            Language::Cpp | Language::ObjectiveCpp => Some(CPP_HEADERS),
            Language::Swift => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The default root and patterns for one source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    pub name: SourceSetName,
    pub root: &'static str,
    pub include: &'static [&'static str],
}

/// Conventional source sets of a unit, in the order they are resolved and reported.
pub fn conventions(kind: UnitKind, language: Language) -> Vec<Convention> {
    let mut conventions = vec![Convention {
        name: language.source_set(),
        root: language.default_root(),
        include: language.default_includes(),
    }];

    if let Some(headers) = language.header_includes() {
        conventions.push(Convention {
            name: PRIVATE_HEADERS.clone(),
            root: "src/main/headers",
            include: headers,
        });
        if kind.has_public_headers() {
            conventions.push(Convention {
                name: PUBLIC_HEADERS.clone(),
                root: "src/main/public",
                include: headers,
            });
        }
    }

    conventions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(kind: UnitKind, language: Language) -> Vec<String> {
        conventions(kind, language)
            .into_iter()
            .map(|convention| convention.name.to_string())
            .collect()
    }

    #[test]
    fn applications_have_private_headers_only() {
        assert_eq!(
            names(UnitKind::Application, Language::C),
            ["c", "private-headers"]
        );
        assert_eq!(
            names(UnitKind::Application, Language::ObjectiveC),
            ["objective-c", "private-headers"]
        );
    }

    #[test]
    fn libraries_export_public_headers() {
        let conventions = conventions(UnitKind::Library, Language::Cpp);
        let roots: Vec<_> = conventions.iter().map(|c| c.root).collect();
        assert_eq!(roots, ["src/main/cpp", "src/main/headers", "src/main/public"]);
        assert!(conventions[2].include.contains(&"**/*.hpp"));
    }

    #[test]
    fn swift_has_no_headers() {
        assert_eq!(names(UnitKind::Library, Language::Swift), ["swift"]);
    }
}
