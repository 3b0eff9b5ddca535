//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/emutest/`
//! - macOS: `~/Library/Application Support/emutest/`
//! - Windows: `%APPDATA%\emutest\`

use std::path::PathBuf;

const APP_NAME: &str = "emutest";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the defaults file
pub fn defaults_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("emutest.toml"))
}
