//! `lfsforge recipe show` as driven through the compiled binary: a
//! known recipe prints its metadata, sources, and dependency list; an
//! unknown name reports failure without touching any pipeline state.

#[path = "support/mod.rs"]
mod support;

use predicates::prelude::*;
use support::Project;

#[test]
fn show_known_recipe_prints_metadata_and_sources() {
    let project = Project::new();
    project.write_recipe(
        "binutils.yml",
        r#"
name: binutils
version: "2.42"
description: GNU assembler, linker, and binary utilities
license: GPL-3.0-or-later
depends: [gcc]
sources:
  - url: https://example.invalid/binutils-2.42.tar.xz
"#,
    );
    let config = project.write_config("");

    support::lfsforge_cmd()
        .args(["--config", config.to_str().unwrap(), "recipe", "show", "binutils"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: binutils"))
        .stdout(predicate::str::contains("version: 2.42"))
        .stdout(predicate::str::contains(
            "description: GNU assembler, linker, and binary utilities",
        ))
        .stdout(predicate::str::contains("license: GPL-3.0-or-later"))
        .stdout(predicate::str::contains("depends: gcc"))
        .stdout(predicate::str::contains("sources: 1"))
        .stdout(predicate::str::contains("https://example.invalid/binutils-2.42.tar.xz"));
}

#[test]
fn show_unknown_recipe_reports_failure() {
    let project = Project::new();
    project.write_recipe("binutils.yml", "name: binutils\nversion: \"2.42\"\n");
    let config = project.write_config("");

    support::lfsforge_cmd()
        .args(["--config", config.to_str().unwrap(), "recipe", "show", "nope"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("nope: no such recipe"));
}
