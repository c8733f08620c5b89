//! Factory configuration
//!
//! Configuration is layered: built-in defaults, then the user file
//! (`~/.config/dahu/config.toml`), then the project file
//! (`.dahu/config.toml`). Later layers override scalar values and extend the
//! plugin path.
//!
//! ```toml
//! workdir = "/data/scratch"
//! plugin_path = ["/opt/dahu/plugins", "plugins"]
//! use_env = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding extra plugin directories, separated like
/// `PATH`.
pub const PLUGIN_PATH_ENV: &str = "DAHU_PLUGINS";

/// Overrides the directory holding the project config file
pub const PROJECT_CONFIG_DIR_ENV: &str = "DAHU_PROJECT_CONFIG_DIR";

/// Default working directory for plugins
pub const DEFAULT_WORKDIR: &str = ".";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawFactoryConfig {
    /// Directory plugins may write into
    pub workdir: Option<PathBuf>,

    /// Built-in plugin directory, searched first
    pub builtin_dir: Option<PathBuf>,

    /// Extra plugin directories
    #[serde(default)]
    pub plugin_path: Vec<PathBuf>,

    /// Append directories from `DAHU_PLUGINS`
    pub use_env: Option<bool>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Directory plugins may write into; passed through untouched
    pub workdir: PathBuf,

    /// Built-in plugin directory, searched first
    pub builtin_dir: Option<PathBuf>,

    /// Plugin directories searched after the built-in one
    pub plugin_path: Vec<PathBuf>,

    /// Append directories from [`PLUGIN_PATH_ENV`] after `plugin_path`
    pub use_env: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            builtin_dir: Some(dahu_paths::plugin_dir()),
            plugin_path: Vec::new(),
            use_env: true,
        }
    }
}

impl FactoryConfig {
    /// Configuration that only searches explicitly added directories
    pub fn isolated() -> Self {
        Self {
            builtin_dir: None,
            use_env: false,
            ..Self::default()
        }
    }

    /// Builder: set the working directory
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Builder: append a plugin directory
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_path.push(dir.into());
        self
    }

    /// Load merged configuration (user + project)
    pub fn load() -> Result<Self, ConfigError> {
        let mut raw = RawFactoryConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Load a single config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::finalize(Self::read_raw(path)?))
    }

    /// User config path
    pub fn user_config_path() -> PathBuf {
        dahu_paths::config_file()
    }

    /// Project config path
    /// Can be overridden with DAHU_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".dahu/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawFactoryConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawFactoryConfig, overlay: RawFactoryConfig) -> RawFactoryConfig {
        let mut plugin_path = base.plugin_path;
        plugin_path.extend(overlay.plugin_path);
        RawFactoryConfig {
            workdir: overlay.workdir.or(base.workdir),
            builtin_dir: overlay.builtin_dir.or(base.builtin_dir),
            plugin_path,
            use_env: overlay.use_env.or(base.use_env),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawFactoryConfig) -> Self {
        let defaults = Self::default();
        Self {
            workdir: raw.workdir.unwrap_or(defaults.workdir),
            builtin_dir: raw.builtin_dir.or(defaults.builtin_dir),
            plugin_path: raw.plugin_path,
            use_env: raw.use_env.unwrap_or(defaults.use_env),
        }
    }

    /// Directories listed in `DAHU_PLUGINS`, in order
    pub fn env_plugin_path() -> Vec<PathBuf> {
        std::env::var_os(PLUGIN_PATH_ENV)
            .map(|value| {
                std::env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every directory to seed discovery with: built-in, configured, then
    /// environment.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.builtin_dir.iter().cloned().collect();
        dirs.extend(self.plugin_path.iter().cloned());
        if self.use_env {
            dirs.extend(Self::env_plugin_path());
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_values() {
        let config = FactoryConfig::default();
        assert_eq!(config.workdir, PathBuf::from("."));
        assert!(config.builtin_dir.is_some());
        assert!(config.plugin_path.is_empty());
        assert!(config.use_env);
    }

    #[test]
    fn test_isolated_has_no_implicit_dirs() {
        let config = FactoryConfig::isolated().with_plugin_dir("/opt/plugins");
        assert_eq!(config.search_dirs(), vec![PathBuf::from("/opt/plugins")]);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
workdir = "/data/scratch"
plugin_path = ["/opt/a", "/opt/b"]
use_env = false
"#,
        )
        .unwrap();

        let config = FactoryConfig::from_file(&path).unwrap();
        assert_eq!(config.workdir, PathBuf::from("/data/scratch"));
        assert_eq!(
            config.plugin_path,
            vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
        assert!(!config.use_env);
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "plugins = 3\n").unwrap();

        let err = FactoryConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_missing_file() {
        let err = FactoryConfig::from_file(Path::new("/nonexistent/dahu.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_merge_overrides_scalars_and_extends_path() {
        let base = RawFactoryConfig {
            workdir: Some(PathBuf::from("/base")),
            builtin_dir: None,
            plugin_path: vec![PathBuf::from("/user/plugins")],
            use_env: Some(false),
        };
        let overlay = RawFactoryConfig {
            workdir: None,
            builtin_dir: Some(PathBuf::from("/builtin")),
            plugin_path: vec![PathBuf::from("/project/plugins")],
            use_env: None,
        };

        let merged = FactoryConfig::merge_raw(base, overlay);
        assert_eq!(merged.workdir, Some(PathBuf::from("/base")));
        assert_eq!(merged.builtin_dir, Some(PathBuf::from("/builtin")));
        assert_eq!(
            merged.plugin_path,
            vec![
                PathBuf::from("/user/plugins"),
                PathBuf::from("/project/plugins")
            ]
        );
        assert_eq!(merged.use_env, Some(false));
    }

    #[test]
    #[serial]
    fn test_load_layers_user_and_project() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(user.path().join("dahu")).unwrap();
        std::fs::write(
            user.path().join("dahu/config.toml"),
            "workdir = \"/user/work\"\nplugin_path = [\"/user/plugins\"]\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join("config.toml"),
            "plugin_path = [\"/project/plugins\"]\n",
        )
        .unwrap();

        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", user.path());
            std::env::set_var(PROJECT_CONFIG_DIR_ENV, project.path());
        }
        let config = FactoryConfig::load();
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var(PROJECT_CONFIG_DIR_ENV);
        }

        let config = config.unwrap();
        assert_eq!(config.workdir, PathBuf::from("/user/work"));
        assert_eq!(
            config.plugin_path,
            vec![
                PathBuf::from("/user/plugins"),
                PathBuf::from("/project/plugins")
            ]
        );
    }

    #[test]
    #[serial]
    fn test_env_plugin_path_is_appended() {
        let joined = std::env::join_paths(["/env/a", "", "/env/b"]).unwrap();
        unsafe {
            std::env::set_var(PLUGIN_PATH_ENV, &joined);
        }
        let config = FactoryConfig {
            builtin_dir: Some(PathBuf::from("/builtin")),
            ..FactoryConfig::default()
        }
        .with_plugin_dir("/explicit");
        let dirs = config.search_dirs();
        unsafe {
            std::env::remove_var(PLUGIN_PATH_ENV);
        }

        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/builtin"),
                PathBuf::from("/explicit"),
                PathBuf::from("/env/a"),
                PathBuf::from("/env/b"),
            ]
        );
    }
}
