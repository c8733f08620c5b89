//! XDG Base Directory paths for dahu.
//!
//! Configuration lives under the XDG config directory; the built-in plugin
//! directory lives under the XDG data directory. The XDG layout is used on
//! every platform. An empty `XDG_*` variable counts as unset.

use std::path::PathBuf;

const APP_DIR: &str = "dahu";

/// Base directory from an XDG variable, falling back to `~/<fallback>`.
fn xdg_base(var: &str, fallback: &str) -> PathBuf {
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .map(|home| home.join(fallback))
            .unwrap_or_else(|| PathBuf::from(fallback)),
    }
}

/// The dahu config directory: `$XDG_CONFIG_HOME/dahu` or `~/.config/dahu`.
///
/// ```
/// let file = dahu_paths::config_dir().join("config.toml");
/// assert!(file.ends_with("dahu/config.toml"));
/// ```
pub fn config_dir() -> PathBuf {
    xdg_base("XDG_CONFIG_HOME", ".config").join(APP_DIR)
}

/// User configuration file
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// The dahu data directory: `$XDG_DATA_HOME/dahu` or `~/.local/share/dahu`.
pub fn data_dir() -> PathBuf {
    xdg_base("XDG_DATA_HOME", ".local/share").join(APP_DIR)
}

/// Built-in plugin directory, always searched first.
///
/// ```
/// let dir = dahu_paths::plugin_dir();
/// assert!(dir.ends_with("dahu/plugins"));
/// ```
pub fn plugin_dir() -> PathBuf {
    data_dir().join("plugins")
}
