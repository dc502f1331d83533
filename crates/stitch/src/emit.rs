use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;
use log::debug;

use crate::module::{Module, ModuleId};
use crate::runtime::{DEFINE_FN, EPILOGUE, PRELUDE, REQUIRE_FN};
use crate::util::js_string_literal;

/// Everything that goes into one bundle: registration bodies keyed by id, plus the entry.
///
/// Registrations keep insertion order, which is the discovery order of the modules, so
/// the rendered bundle only depends on the source tree.
#[derive(Debug, Clone)]
pub struct BundleManifest {
    registrations: IndexMap<ModuleId, String>,
    entry: ModuleId,
}

impl BundleManifest {
    /// Build a manifest from transformed modules.
    ///
    /// Fails if two modules share an id or if `entry` is not one of them.
    pub fn new(modules: Vec<Module>, entry: ModuleId) -> Result<Self> {
        let mut registrations = IndexMap::with_capacity(modules.len());
        for module in modules {
            if registrations.contains_key(&module.id) {
                bail!("Duplicate module id in bundle: {}", module.id);
            }
            registrations.insert(module.id, module.transformed_source);
        }

        if !registrations.contains_key(&entry) {
            return Err(anyhow!(
                "Entry module {} is not among the {} discovered modules",
                entry,
                registrations.len()
            ));
        }

        Ok(Self {
            registrations,
            entry,
        })
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Render the complete bundle: loader, one registration per module, then the bootstrap.
    pub fn render(&self) -> String {
        let body_len: usize = self.registrations.values().map(String::len).sum();
        let mut out = String::with_capacity(PRELUDE.len() + body_len + 128 * self.len());

        out.push_str(PRELUDE);
        out.push('\n');
        for (id, body) in &self.registrations {
            debug!("Emitting registration for {}", id);
            out.push_str(&format!(
                "{DEFINE_FN}({}, function(require, module, exports){{\n{}\n}});\n",
                js_string_literal(id.as_str()),
                body
            ));
        }
        out.push_str(&format!(
            "{REQUIRE_FN}({});\n",
            js_string_literal(self.entry.as_str())
        ));
        out.push_str(EPILOGUE);
        out.push('\n');
        out
    }
}
