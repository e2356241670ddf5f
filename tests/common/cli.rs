//! Helpers for running the `qarnot-deadline` binary in isolation.
//!
//! Included by the CLI test crates via:
//!
//! ```rust
//! #[path = "common/cli.rs"]
//! mod cli;
//! ```

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Creates a scratch directory used as working directory and home.
pub fn tempdir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"))
}

/// Builds a command that sees no Qarnot settings beyond those the test adds.
///
/// The working directory, `HOME` and `XDG_CONFIG_HOME` point at `home` so no
/// stray `qarnot-deadline.toml` is discovered.
pub fn isolated_cmd(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("qarnot-deadline");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("QARNOT_DEADLINE_CONFIG_PATH")
        .env_remove("QARNOT_TOKEN")
        .env_remove("QARNOT_CLUSTER");
    cmd
}
