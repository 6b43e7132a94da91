// Shared helpers for the CLI tests.
#![allow(dead_code)]

use assert_cmd::Command;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variables `bf run` layers between its flags and its config file.
pub const SETTINGS_ENV: [&str; 4] = ["BF_TAPE_SIZE", "BF_MAX_STEPS", "BF_TIMEOUT_MS", "BF_EOF"];

/// An empty directory standing in for the config home of every test run.
fn empty_home() -> &'static Path {
    static HOME: OnceLock<tempfile::TempDir> = OnceLock::new();
    HOME.get_or_init(|| tempfile::tempdir().expect("tempdir")).path()
}

/// The `bf` binary with no `BF_*` settings and no `bf.toml` in reach.
///
/// Tests that exercise a layer set their own variable or config home on top.
pub fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").expect("failed to locate bf binary");
    for var in SETTINGS_ENV {
        cmd.env_remove(var);
    }
    cmd.env("XDG_CONFIG_HOME", empty_home()).env("HOME", empty_home());
    cmd.timeout(Duration::from_secs(10));
    cmd
}

pub fn source_file(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

/// A config home holding `bf.toml` with `contents`, under both the XDG and
/// `$HOME/.config` locations.
pub fn config_home(contents: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bf.toml"), contents).unwrap();
    std::fs::create_dir_all(dir.path().join(".config")).unwrap();
    std::fs::write(dir.path().join(".config").join("bf.toml"), contents).unwrap();
    dir
}
