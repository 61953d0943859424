use std::path::{Path, PathBuf};

use srcset_resolver::{ErrorKind, ResolveError};
use srcset_types::{ResolvedSourceSet, SourceSetName};

use crate::cfgs::default_configs;
use crate::defs::BUILD_FILENAME;
use crate::Workspace;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

fn relative(result: &Result<ResolvedSourceSet, ResolveError>) -> Vec<PathBuf> {
    result.as_ref().unwrap().relative_files().to_vec()
}

static BUILD: &str = r#"
[units.app]
kind = "application"
language = "c"

[units.app.sources.c]
root = "srcs"
include = ["**/*.c"]

[units.app.sources.private-headers]
root = "hdrs"

[units.greeter]
kind = "library"
language = "c"

[units.greeter.sources.c]
root = "greeter/srcs"

[units.greeter.sources.private-headers]
root = "greeter/hdrs"

[units.greeter.sources.public-headers]
root = "greeter/incs"
"#;

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("BUILD.srcset.toml"), BUILD).unwrap();
    for file in [
        "srcs/main.c",
        "srcs/util/strings.c",
        "srcs/README.md",
        "hdrs/util.h",
        "greeter/srcs/greeter.c",
        "greeter/hdrs/internal.h",
        "greeter/incs/greeter.h",
    ] {
        touch(dir.path(), file);
    }
    dir
}

#[tokio::test]
async fn smoketest_resolve_unit() {
    let dir = workspace();
    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();
    assert_eq!(workspace.units().count(), 2);

    let app = workspace.resolve_unit("app").await.unwrap();
    assert!(app.is_ok());
    assert_eq!(app.unit(), "app");

    let names: Vec<_> = app.iter().map(|(name, _)| name.to_string()).collect();
    assert_eq!(names, ["c", "private-headers"]);

    let c = app.get(&SourceSetName::const_new("c")).unwrap();
    assert_eq!(
        relative(c),
        [PathBuf::from("main.c"), PathBuf::from("util/strings.c")]
    );
    let headers = app.get(&SourceSetName::const_new("private-headers")).unwrap();
    assert_eq!(relative(headers), [PathBuf::from("util.h")]);
    assert_eq!(app.num_files(), 3);
}

#[tokio::test]
async fn smoketest_resolve_all() {
    let dir = workspace();
    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();

    let units = workspace.resolve_all().await.unwrap();
    let names: Vec<_> = units.iter().map(|unit| unit.unit()).collect();
    assert_eq!(names, ["app", "greeter"]);

    let greeter = &units[1];
    assert!(greeter.is_ok());
    let public = greeter
        .get(&SourceSetName::const_new("public-headers"))
        .unwrap();
    assert_eq!(relative(public), [PathBuf::from("greeter.h")]);
    assert_eq!(greeter.num_files(), 3);
}

#[tokio::test]
async fn missing_conventional_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("BUILD.srcset.toml"),
        r#"
        [units.greeter]
        kind = "library"
        language = "c"
        "#,
    )
    .unwrap();
    touch(dir.path(), "src/main/c/greeter.c");

    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();
    let greeter = workspace.resolve_unit("greeter").await.unwrap();
    assert!(greeter.is_ok());

    let c = greeter.get(&SourceSetName::const_new("c")).unwrap();
    assert_eq!(relative(c), [PathBuf::from("greeter.c")]);
    for name in ["private-headers", "public-headers"] {
        let set = greeter.get(&SourceSetName::const_new(name)).unwrap();
        assert!(set.as_ref().unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn missing_explicit_root_is_an_error() {
    let dir = workspace();
    std::fs::remove_dir_all(dir.path().join("hdrs")).unwrap();

    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();
    let app = workspace.resolve_unit("app").await.unwrap();
    assert!(!app.is_ok());

    let errors: Vec<_> = app.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::NotFound);
    assert_eq!(errors[0].name().as_str(), "private-headers");

    // The other set still resolves.
    let c = app.get(&SourceSetName::const_new("c")).unwrap();
    assert_eq!(relative(c).len(), 2);
}

#[tokio::test]
async fn unknown_unit() {
    let dir = workspace();
    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();
    let err = workspace.resolve_unit("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "no build unit named 'nope'");
}

#[test]
fn load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = Workspace::load(dir.path(), default_configs()).unwrap_err();
    assert!(err.to_string().starts_with("reading build file"), "{err}");

    std::fs::write(dir.path().join("BUILD.srcset.toml"), "[units.app]\nkind = 1\n").unwrap();
    let err = Workspace::load(dir.path(), default_configs()).unwrap_err();
    assert!(err.to_string().starts_with("parsing build file"), "{err}");

    std::fs::write(
        dir.path().join("BUILD.srcset.toml"),
        r#"
        [units.app]
        kind = "application"
        language = "c"

        [units.app.sources.assets]
        root = "res"
        "#,
    )
    .unwrap();
    assert!(Workspace::load(dir.path(), default_configs()).is_err());
}

#[test]
fn build_filename_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("units.toml"),
        "[units.app]\nkind = \"application\"\nlanguage = \"swift\"\n",
    )
    .unwrap();

    let configs = default_configs();
    configs.update(&BUILD_FILENAME, "units.toml");
    let workspace = Workspace::load(dir.path(), configs).unwrap();
    let app = workspace.unit("app").unwrap();
    assert_eq!(app.specs().count(), 1);
}

#[test]
fn watched_unit_recovers_missing_conventional_roots() {
    let dir = workspace();
    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();

    // Not a set of this unit.
    let watched = workspace.watch_unit("app").unwrap();
    assert!(watched
        .get(&SourceSetName::const_new("public-headers"))
        .is_none());

    let c = watched.get(&SourceSetName::const_new("c")).unwrap().unwrap();
    assert_eq!(c.len(), 2);

    std::fs::write(
        dir.path().join("BUILD.srcset.toml"),
        "[units.app]\nkind = \"library\"\nlanguage = \"cpp\"\n",
    )
    .unwrap();
    let workspace = Workspace::load(dir.path(), default_configs()).unwrap();
    let watched = workspace.watch_unit("app").unwrap();
    let public = watched
        .get(&SourceSetName::const_new("public-headers"))
        .unwrap()
        .unwrap();
    assert!(public.is_empty());
}
