use std::fs;

use assert_cmd::Command;

fn shelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env("SHELF_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "off")
        .env_remove("SHELF_ENV");
    cmd
}

fn output(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn check_config_reports_layered_settings() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("base.toml"),
        "[server]\nport = 9000\n\n[[catalog.categories]]\nid = 1\nname = \"Fiction\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("staging.toml"), "[database]\nbackend = \"memory\"\n").unwrap();

    let stdout = output(
        shelf(dir.path())
            .env("SHELF_ENV", "staging")
            .env("SHELF__SERVER__HOST", "127.0.0.1")
            .arg("check-config"),
    );

    assert!(stdout.contains("environment: Staging"));
    assert!(stdout.contains("listen: 127.0.0.1:9000"));
    assert!(stdout.contains("database: Memory"));
    assert!(stdout.contains("categories: 1"));
}

#[test]
fn migrate_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");

    let first = output(
        shelf(dir.path())
            .env("SHELF__DATABASE__PATH", &db_path)
            .arg("migrate"),
    );
    assert!(first.contains("applied 1 migration(s)"));
    assert!(db_path.exists());

    let second = output(
        shelf(dir.path())
            .env("SHELF__DATABASE__PATH", &db_path)
            .arg("migrate"),
    );
    assert!(second.contains("applied 0 migration(s)"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    shelf(dir.path())
        .env("SHELF_ENV", "moon")
        .arg("check-config")
        .assert()
        .failure();
}
