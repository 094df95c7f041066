//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wr_core::GridGeometry;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the JSON task list.
    pub tasks_path: PathBuf,

    /// Pixel geometry of the rendered grid.
    #[serde(default)]
    pub grid: GridGeometry,

    /// Visible height of the grid, used to center the current time.
    pub viewport_height: f64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            tasks_path: data_dir.join("tasks.json"),
            grid: GridGeometry::default(),
            viewport_height: 720.0,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `path`, then
    /// `WR_*` environment variables (`__` separates nested keys, as in
    /// `WR_GRID__HOUR_HEIGHT`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("WR_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for workrail.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("workrail"))
}

/// Returns the platform-specific data directory for workrail.
///
/// On Linux: `~/.local/share/workrail`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("workrail"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn test_dirs_data_path_ends_with_workrail() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "workrail");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_tasks() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.tasks_path, data_dir.join("tasks.json"));
        assert_eq!(config.grid, GridGeometry::default());
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wr.toml",
                r#"
                    tasks_path = "/tmp/from-file.json"
                    viewport_height = 500.0

                    [grid]
                    hour_height = 48.0
                "#,
            )?;
            jail.set_env("WR_VIEWPORT_HEIGHT", "640");
            jail.set_env("WR_GRID__VERTICAL_PADDING", "4");

            let config = Config::load_from(Some(Path::new("wr.toml")))?;
            assert_eq!(config.tasks_path, PathBuf::from("/tmp/from-file.json"));
            assert!((config.viewport_height - 640.0).abs() < f64::EPSILON);
            assert!((config.grid.hour_height - 48.0).abs() < f64::EPSILON);
            assert!((config.grid.vertical_padding - 4.0).abs() < f64::EPSILON);
            Ok(())
        });
    }
}
