use anyhow::{Context, Result, bail};
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::module::ModuleId;

/// A module file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    pub id: ModuleId,
    pub path: PathBuf,
}

/// Walk `root` and return every file with the given extension, sorted by module id.
///
/// The walk does not follow symlinks. Any unreadable entry aborts discovery so that a
/// bundle is never assembled from a partial view of the tree.
pub fn discover_modules(root: &Path, extension: &str) -> Result<Vec<DiscoveredModule>> {
    let metadata = fs::metadata(root)
        .with_context(|| format!("Failed to read source root: {:?}", root))?;
    if !metadata.is_dir() {
        bail!("Source root is not a directory: {:?}", root);
    }

    debug!("Scanning source root: {:?}", root);

    let mut modules = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan source root: {:?}", root))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extension) {
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .with_context(|| format!("File {:?} is outside source root {:?}", path, root))?;
        let id = ModuleId::from_relative_path(relative_path)
            .with_context(|| format!("Invalid module file name: {:?}", path))?;
        trace!("Found module {} at {:?}", id, path);
        modules.push(DiscoveredModule {
            id,
            path: path.to_path_buf(),
        });
    }

    // Directory order from the walk is not the same as string order of the ids
    // ("./a/b.js" vs "./a.js"), so sort on the id itself.
    modules.sort_by(|a, b| a.id.cmp(&b.id));

    debug!("Discovered {} modules under {:?}", modules.len(), root);
    Ok(modules)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
