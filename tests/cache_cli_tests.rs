//! Cache CLI tests against isolated cache directories.

mod common;

use predicates::prelude::*;

#[test]
fn test_cache_stats_empty() {
    let workspace = common::TestWorkspace::new();
    common::jumpstart_cmd(&workspace)
        .arg("cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache Statistics"))
        .stdout(predicate::str::contains("Cache is empty"));
}

#[test]
fn test_cache_list_empty() {
    let workspace = common::TestWorkspace::new();
    common::jumpstart_cmd(&workspace)
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached entries"));
}

#[test]
fn test_cache_verify_empty() {
    let workspace = common::TestWorkspace::new();
    common::jumpstart_cmd(&workspace)
        .args(["cache", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("all checksums match"));
}

#[test]
fn test_cache_clear_empty() {
    let workspace = common::TestWorkspace::new();
    common::jumpstart_cmd(&workspace)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));
}

#[test]
fn test_cache_clear_only_rejects_bad_coordinate() {
    let workspace = common::TestWorkspace::new();
    common::jumpstart_cmd(&workspace)
        .args(["cache", "clear", "--only", "not-a-coordinate"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not-a-coordinate"));
}

#[test]
fn test_cache_dir_flag_overrides_env() {
    let workspace = common::TestWorkspace::new();
    let override_dir = workspace.path.join("other-cache");

    common::jumpstart_cmd(&workspace)
        .args(["--cache-dir", override_dir.to_str().expect("utf-8 path"), "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other-cache"));
}
