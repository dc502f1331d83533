use anyhow::{Result, anyhow};
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

use crate::util::relative_path_to_slash;

/// Path of a module relative to the source root, always written as `./a/b.js`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(String);

impl ModuleId {
    /// Build an id from a path relative to the source root
    pub fn from_relative_path(relative_path: &Path) -> Result<Self> {
        relative_path_to_slash(relative_path)
            .map(|path| Self(format!("./{path}")))
            .ok_or_else(|| {
                anyhow!(
                    "Cannot derive a module id from {:?}: path must be relative, inside the source root and valid UTF-8",
                    relative_path
                )
            })
    }

    /// Parse a user-supplied id such as `main.js` or `./lib/ui.js`
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let unrooted = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if unrooted.is_empty() || unrooted.starts_with('/') {
            return Err(anyhow!(
                "Invalid module id '{}': expected a path relative to the source root",
                value
            ));
        }
        let slashed = unrooted.replace('\\', "/");
        Self::from_relative_path(Path::new(&slashed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One source file after transformation
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub raw_source: String,
    pub transformed_source: String,
    /// Names copied onto `exports`, in the order they were found
    pub exported_names: Vec<String>,
    /// `require("...")` specifiers in the transformed source, in source order
    pub dependencies: Vec<String>,
}
