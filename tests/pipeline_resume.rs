//! Resume semantics across two separate process invocations: without
//! `--continue` every targeted package is rebuilt; with it, a package
//! already recorded `ok` is left alone.

#[path = "support/mod.rs"]
mod support;

use predicates::prelude::*;
use support::Project;

fn counting_recipe(counter_path: &std::path::Path) -> String {
    format!(
        r#"
name: gcc
version: "1.0"
build:
  make: "echo built >> {counter:?}"
  install: "mkdir -p \"$DESTDIR/usr\"; touch \"$DESTDIR/usr/marker\""
"#,
        counter = counter_path.to_str().unwrap()
    )
}

#[test]
fn continue_flag_skips_already_built_package() {
    let project = Project::new();
    let counter = project.dir.path().join("build-count.txt");
    project.write_recipe("gcc.yml", &counting_recipe(&counter));
    project.seed_extracted("gcc");
    let config = project.write_config("");

    support::lfsforge_cmd()
        .args(["--config", config.to_str().unwrap(), "build", "--retry", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gcc: ok"));
    assert_eq!(std::fs::read_to_string(&counter).unwrap().lines().count(), 1);

    support::lfsforge_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "build",
            "--continue",
            "--retry",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("gcc: ok"));
    assert_eq!(
        std::fs::read_to_string(&counter).unwrap().lines().count(),
        1,
        "a --continue rerun must not re-execute a package already recorded ok"
    );
}

#[test]
fn without_continue_a_second_run_rebuilds_from_scratch() {
    let project = Project::new();
    let counter = project.dir.path().join("build-count.txt");
    project.write_recipe("gcc.yml", &counting_recipe(&counter));
    project.seed_extracted("gcc");
    let config = project.write_config("");

    for _ in 0..2 {
        support::lfsforge_cmd()
            .args(["--config", config.to_str().unwrap(), "build", "--retry", "0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("gcc: ok"));
    }
    assert_eq!(std::fs::read_to_string(&counter).unwrap().lines().count(), 2);
}
