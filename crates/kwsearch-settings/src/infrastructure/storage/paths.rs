//! Locations of the settings and keyword list files.
//!
//! Every file lives in one per-user configuration directory:
//! - Windows:  `%APPDATA%\KeywordSearch`
//! - Linux:    `$XDG_CONFIG_HOME/kwsearch` or `~/.config/kwsearch`
//! - macOS:    `~/Library/Application Support/KeywordSearch`
//!
//! Setting `KWSEARCH_CONFIG_DIR` overrides the platform directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable that overrides the platform configuration directory.
pub const CONFIG_DIR_ENV: &str = "KWSEARCH_CONFIG_DIR";

/// Context used when the caller does not name one.
pub const DEFAULT_CONTEXT: &str = "General";

/// Extension of every key/value settings file.
pub const SETTINGS_EXTENSION: &str = "properties";

#[derive(Debug, Error)]
pub enum ConfigDirError {
    /// Neither the override variable nor the platform variables are set.
    #[error("could not determine platform config directory (set {CONFIG_DIR_ENV})")]
    NoPlatformConfigDir,
}

/// Resolves the configuration directory, honouring [`CONFIG_DIR_ENV`].
///
/// # Errors
///
/// Returns [`ConfigDirError::NoPlatformConfigDir`] when no directory can be
/// derived from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigDirError> {
    std::env::var_os(CONFIG_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(platform_config_dir)
        .ok_or(ConfigDirError::NoPlatformConfigDir)
}

/// `<dir>/<module>-<context>.properties`
pub fn settings_file_path(dir: &Path, module: &str, context: &str) -> PathBuf {
    dir.join(format!("{module}-{context}.{SETTINGS_EXTENSION}"))
}

/// `<dir>/keywords-<context>.toml`
pub fn keyword_lists_file_path(dir: &Path, context: &str) -> PathBuf {
    dir.join(format!("keywords-{context}.toml"))
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KeywordSearch"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("kwsearch"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("KeywordSearch")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_file_path_joins_module_and_context() {
        let path = settings_file_path(Path::new("/cfg"), "KeywordSearch_NSRL", DEFAULT_CONTEXT);
        assert_eq!(path, PathBuf::from("/cfg/KeywordSearch_NSRL-General.properties"));
    }

    #[test]
    fn test_same_pair_always_resolves_to_same_path() {
        let dir = Path::new("/cfg");
        assert_eq!(
            settings_file_path(dir, "m", "case-1"),
            settings_file_path(dir, "m", "case-1")
        );
        assert_ne!(
            settings_file_path(dir, "m", "case-1"),
            settings_file_path(dir, "m", "case-2")
        );
    }

    #[test]
    fn test_keyword_lists_file_path_uses_context() {
        let path = keyword_lists_file_path(Path::new("/cfg"), "General");
        assert!(path.ends_with("keywords-General.toml"), "got {path:?}");
    }

    #[test]
    fn test_platform_config_dir_returns_some_when_env_is_available() {
        let result = platform_config_dir();
        #[cfg(target_os = "linux")]
        {
            let has_xdg = std::env::var_os("XDG_CONFIG_HOME").is_some();
            let has_home = std::env::var_os("HOME").is_some();
            if has_xdg || has_home {
                assert!(result.is_some());
            }
        }
        #[cfg(target_os = "windows")]
        if std::env::var_os("APPDATA").is_some() {
            assert!(result.is_some());
        }
        #[cfg(target_os = "macos")]
        if std::env::var_os("HOME").is_some() {
            assert!(result.is_some());
        }
        let _ = result;
    }
}
