//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/vandydine/` | `~/.local/share/vandydine/` |
//! | Config | `~/Library/Application Support/vandydine/` | `~/.config/vandydine/` |
//!
//! # Environment Overrides
//!
//! - `VANDYDINE_DATA_DIR` overrides [`data_dir`]
//! - `VANDYDINE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root, holding the persisted snapshot.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VANDYDINE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("vandydine"))
        .unwrap_or_else(|| PathBuf::from("/tmp/vandydine-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VANDYDINE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("vandydine"))
        .unwrap_or_else(|| PathBuf::from("/tmp/vandydine-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default persisted snapshot path (`data_dir()/snapshot.json`).
#[must_use]
pub fn snapshot_file() -> PathBuf {
    data_dir().join("snapshot.json")
}
