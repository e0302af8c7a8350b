//! Two concurrent `lfsforge build` invocations targeting the same
//! package: the second one must observe the first's `(build, pkg)`
//! advisory lock as busy and skip rather than block or double-run the
//! phase commands.

#[path = "support/mod.rs"]
mod support;

use std::time::{Duration, Instant};

use predicates::prelude::*;
use support::Project;

fn wait_for(path: &std::path::Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn concurrent_build_of_same_package_yields_one_winner() {
    let project = Project::new();
    let started = project.dir.path().join("started");
    let done = project.dir.path().join("done");
    project.write_recipe(
        "slow.yml",
        &format!(
            r#"
name: slow
version: "1.0"
build:
  make: "touch {started:?}; sleep 2; touch {done:?}"
  install: "mkdir -p \"$DESTDIR/usr\"; touch \"$DESTDIR/usr/marker\""
"#,
            started = started.to_str().unwrap(),
            done = done.to_str().unwrap(),
        ),
    );
    project.seed_extracted("slow");
    let config = project.write_config("");

    let bin = env!("CARGO_BIN_EXE_lfsforge");
    let mut first = std::process::Command::new(bin)
        .args([
            "--config",
            config.to_str().unwrap(),
            "build",
            "--pkg",
            "slow",
            "--retry",
            "0",
        ])
        .spawn()
        .expect("spawn first build");

    assert!(
        wait_for(&started, Duration::from_secs(5)),
        "first invocation never reached its make phase"
    );
    assert!(!done.exists(), "first invocation finished before the second could race it");

    support::lfsforge_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "build",
            "--pkg",
            "slow",
            "--retry",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("slow: skipped (locked)"));

    let status = first.wait().expect("wait for first build");
    assert!(status.success());
    assert!(done.exists());
}
