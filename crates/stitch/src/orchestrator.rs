use anyhow::{Context, Result};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::discovery::discover_modules;
use crate::emit::BundleManifest;
use crate::module::Module;
use crate::module_graph::ModuleGraph;
use crate::transform::transform_module;

/// Summary of a bundle written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub output: PathBuf,
    pub bytes: u64,
    pub modules: usize,
}

pub struct BundleOrchestrator {
    config: Config,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Discover, transform and assemble the bundle without writing it
    pub fn bundle_to_string(&self) -> Result<String> {
        Ok(self.assemble()?.render())
    }

    /// Build the bundle and write it to the configured output path.
    ///
    /// The bundle is written to a temporary file next to the output and renamed into place,
    /// so a failed build never leaves a partial file behind.
    pub fn bundle(&self) -> Result<BundleReport> {
        let manifest = self.assemble()?;
        let bundle = manifest.render();
        let output = &self.config.output;
        let bytes = write_atomically(output, bundle.as_bytes())?;
        info!("Bundle sha256: {:x}", Sha256::digest(bundle.as_bytes()));
        info!("Bundle written to: {:?}", output);
        Ok(BundleReport {
            output: output.clone(),
            bytes,
            modules: manifest.len(),
        })
    }

    fn assemble(&self) -> Result<BundleManifest> {
        info!("Starting bundle process");
        debug!("Source root: {:?}", self.config.src);
        debug!("Entry module: {}", self.config.entry);

        let modules = self.load_modules()?;
        self.check_module_graph(&modules);

        let manifest = BundleManifest::new(modules, self.config.entry.clone())
            .with_context(|| format!("Invalid entry for source root {:?}", self.config.src))?;
        info!("Assembling {} modules", manifest.len());
        Ok(manifest)
    }

    fn load_modules(&self) -> Result<Vec<Module>> {
        let discovered = discover_modules(&self.config.src, &self.config.extension)?;

        discovered
            .into_iter()
            .map(|found| {
                let source = fs::read_to_string(&found.path)
                    .with_context(|| format!("Failed to read module file: {:?}", found.path))?;
                transform_module(found.id, source)
            })
            .collect()
    }

    /// Log what the loader will run into when the bundle executes.
    ///
    /// None of these findings fail the build: circular requires are supported by the loader,
    /// and unregistered ids only throw if and when the require actually runs.
    fn check_module_graph(&self, modules: &[Module]) {
        let graph = ModuleGraph::from_modules(modules);

        let cycles = graph.cycles();
        if !cycles.is_empty() {
            warn!(
                "Detected {} circular dependencies - proceeding with bundling",
                cycles.len()
            );
            for (i, cycle) in cycles.iter().enumerate() {
                let names: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
                warn!("  Cycle {}: {}", i + 1, names.join(" → "));
            }
        }

        if !graph.contains(self.config.entry.as_str()) {
            return;
        }

        let trace = graph.simulate(self.config.entry.as_str());
        for edge in &trace.unregistered_requires {
            if let Some(from) = &edge.from {
                warn!(
                    "Module {} requires '{}', which is not a bundled module; it will throw when evaluated",
                    from, edge.specifier
                );
            }
        }
        for edge in &trace.partial_requires {
            if let Some(from) = &edge.from {
                debug!(
                    "Module {} receives partially initialized exports of '{}'",
                    from, edge.specifier
                );
            }
        }
        for id in &trace.unreachable {
            debug!("Module {} is bundled but not reachable from {}", id, self.config.entry);
        }
        debug!(
            "Evaluation order: {}",
            trace
                .evaluation_order
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Write `contents` to `path` through a temporary file in the same directory
fn write_atomically(path: &Path, contents: &[u8]) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to write output file: {:?}", path))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .with_context(|| format!("Failed to write output file: {:?}", path))?;

    // Temporary files are created owner-only; the bundle is served as a static asset
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .with_context(|| format!("Failed to set permissions on output file: {:?}", path))?;
    }

    file.persist(path)
        .with_context(|| format!("Failed to write output file: {:?}", path))?;

    let bytes = fs::metadata(path)
        .with_context(|| format!("Failed to read output file metadata: {:?}", path))?
        .len();
    Ok(bytes)
}
