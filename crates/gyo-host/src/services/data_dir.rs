// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution for the host.

use std::path::PathBuf;

use gyo_core::config::CONFIG_FILE;

/// Return the host's data directory, creating it if needed.
///
/// `$XDG_DATA_HOME/gyo`, else `~/.local/share/gyo`.
pub fn data_dir() -> PathBuf {
    let dir = base_dir(
        std::env::var("XDG_DATA_HOME").ok(),
        std::env::var("HOME").ok(),
    )
    .join("gyo");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "could not create data directory");
    }
    dir
}

/// Where `gyo-config.json` lives inside `dir`.
pub fn config_path(dir: &std::path::Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

fn base_dir(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(xdg) = xdg_data_home.filter(|s| !s.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|s| !s.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = base_dir(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(base, PathBuf::from("/xdg"));
    }

    #[test]
    fn home_fallback() {
        let base = base_dir(None, Some("/home/u".into()));
        assert_eq!(base, PathBuf::from("/home/u/.local/share"));
        let base = base_dir(Some(String::new()), Some("/home/u".into()));
        assert_eq!(base, PathBuf::from("/home/u/.local/share"));
    }

    #[test]
    fn config_file_name() {
        let path = config_path(std::path::Path::new("/data/gyo"));
        assert_eq!(path, PathBuf::from("/data/gyo/gyo-config.json"));
    }
}
