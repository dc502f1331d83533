use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::combine::Combine;
use crate::dirs::config_files;
use crate::module::ModuleId;

/// Settings as they appear in a `stitch.toml` file, the environment or on the command line.
///
/// Every field is optional so that layers can be merged; [`Config::from_options`] fills in
/// the defaults and validates the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Source root scanned for modules
    pub src: Option<PathBuf>,

    /// Module required by the bootstrap call, relative to `src`
    pub entry: Option<String>,

    /// Path of the bundle to write
    pub output: Option<PathBuf>,

    /// File extension of source modules, with or without the leading dot
    pub extension: Option<String>,
}

impl Combine for Options {
    fn combine(self, other: Self) -> Self {
        Self {
            src: self.src.combine(other.src),
            entry: self.entry.combine(other.entry),
            output: self.output.combine(other.output),
            extension: self.extension.combine(other.extension),
        }
    }
}

impl Options {
    /// Load a single config file from a path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load options from environment variables with STITCH_ prefix
    pub fn from_env() -> Self {
        let var = |name: &str| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        Self {
            src: var("STITCH_SRC").map(PathBuf::from),
            entry: var("STITCH_ENTRY"),
            output: var("STITCH_OUTPUT").map(PathBuf::from),
            extension: var("STITCH_EXTENSION"),
        }
    }
}

/// Fully resolved bundler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Source root scanned for modules
    pub src: PathBuf,

    /// Module required by the bootstrap call
    pub entry: ModuleId,

    /// Path of the bundle to write
    pub output: PathBuf,

    /// File extension of source modules, without the leading dot
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src/js"),
            entry: ModuleId::parse("./main.js").expect("default entry is a valid module id"),
            output: PathBuf::from("static/script.js"),
            extension: "js".to_owned(),
        }
    }
}

impl Config {
    /// Resolve options against the defaults
    pub fn from_options(options: Options) -> Result<Self> {
        let defaults = Self::default();

        let entry = match options.entry {
            Some(entry) => ModuleId::parse(&entry).context("Invalid entry in configuration")?,
            None => defaults.entry,
        };
        let extension = match options.extension {
            Some(extension) => Self::parse_extension(&extension)?,
            None => defaults.extension,
        };

        Ok(Self {
            src: options.src.unwrap_or(defaults.src),
            entry,
            output: options.output.unwrap_or(defaults.output),
            extension,
        })
    }

    /// Normalize an extension such as `.js` to `js`
    pub fn parse_extension(value: &str) -> Result<String> {
        let extension = value.trim().trim_start_matches('.');
        if extension.is_empty()
            || !extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(anyhow!(
                "Invalid source extension '{}': expected something like 'js' or '.mjs'",
                value
            ));
        }
        Ok(extension.to_owned())
    }

    /// Load configuration with hierarchical precedence:
    /// 1. Command-line overrides (highest precedence)
    /// 2. CLI-provided config path
    /// 3. Environment variables (STITCH_*)
    /// 4. Project config (stitch.toml in the current directory)
    /// 5. User config (~/.config/stitch/stitch.toml)
    /// 6. System config (/etc/stitch/stitch.toml or equivalent)
    /// 7. Default values (lowest precedence)
    pub fn load(cli_config_path: Option<&Path>, overrides: Options) -> Result<Self> {
        let project_dir = env::current_dir().context("Failed to determine current directory")?;
        Self::load_in(&project_dir, cli_config_path, overrides)
    }

    /// Same as [`Config::load`], looking for the project config in `project_dir`
    pub fn load_in(
        project_dir: &Path,
        cli_config_path: Option<&Path>,
        overrides: Options,
    ) -> Result<Self> {
        let mut options = Options::default();

        for (scope, path) in config_files(project_dir) {
            log::debug!("Loading {} from: {:?}", scope.label(), path);
            let loaded = Options::load_from_file(&path)
                .with_context(|| format!("Failed to load {} from {:?}", scope.label(), path))?;
            options = loaded.combine(options);
        }

        options = Options::from_env().combine(options);

        if let Some(cli_config_path) = cli_config_path {
            log::debug!("Loading CLI config from: {:?}", cli_config_path);
            let loaded = Options::load_from_file(cli_config_path).with_context(|| {
                format!("Failed to load CLI config from {:?}", cli_config_path)
            })?;
            options = loaded.combine(options);
        }

        options = overrides.combine(options);
        log::trace!("Merged options: {:?}", options);

        Self::from_options(options)
    }
}
