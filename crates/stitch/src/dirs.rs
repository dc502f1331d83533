use std::env;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;

/// Directory name used below the platform configuration roots
const CONFIG_DIR: &str = "stitch";

/// Configuration file name, both for the project and the user/system locations
pub const CONFIG_FILE: &str = "stitch.toml";

/// Where a configuration file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    System,
    User,
    Project,
}

impl ConfigScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "system config",
            Self::User => "user config",
            Self::Project => "project config",
        }
    }
}

/// Configuration files that exist, lowest precedence first.
///
/// `project_dir` is searched for `stitch.toml` directly; the user file lives in the
/// platform config directory (`$XDG_CONFIG_HOME/stitch/stitch.toml` on Linux) and the
/// system file in `$XDG_CONFIG_DIRS` or `/etc/stitch/stitch.toml`.
pub fn config_files(project_dir: &Path) -> Vec<(ConfigScope, PathBuf)> {
    let candidates = [
        (ConfigScope::System, system_config_file()),
        (ConfigScope::User, user_config_file()),
        (ConfigScope::Project, Some(project_dir.join(CONFIG_FILE))),
    ];

    candidates
        .into_iter()
        .filter_map(|(scope, path)| path.filter(|p| p.is_file()).map(|p| (scope, p)))
        .collect()
}

/// `stitch.toml` inside the user configuration directory
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

/// The first system-wide `stitch.toml` that exists
#[cfg(not(windows))]
pub fn system_config_file() -> Option<PathBuf> {
    let xdg_config_dirs = env::var("XDG_CONFIG_DIRS").ok();
    find_in_xdg_dirs(xdg_config_dirs.as_deref()).or_else(|| {
        let candidate = Path::new("/etc").join(CONFIG_DIR).join(CONFIG_FILE);
        match candidate.try_exists() {
            Ok(true) => Some(candidate),
            Ok(false) => None,
            Err(err) => {
                log::warn!("Failed to query system configuration file: {err}");
                None
            }
        }
    })
}

/// `%SYSTEMDRIVE%\ProgramData\stitch\stitch.toml`
#[cfg(windows)]
pub fn system_config_file() -> Option<PathBuf> {
    let system_drive = env::var("SYSTEMDRIVE").ok()?;
    let candidate = PathBuf::from(system_drive)
        .join("ProgramData")
        .join(CONFIG_DIR)
        .join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

#[cfg(not(windows))]
fn find_in_xdg_dirs(value: Option<&str>) -> Option<PathBuf> {
    let config_dirs = value.filter(|s| !s.is_empty()).unwrap_or("/etc/xdg");
    config_dirs
        .split(':')
        .take_while(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(CONFIG_DIR).join(CONFIG_FILE))
        .find(|path| path.is_file())
}
