//! Pattern-based rewriting of `import`/`export` statements.
//!
//! The transformer never tokenizes or parses its input. Every rule is a regular expression
//! applied to the whole module text, so look-alike text inside strings and comments is
//! rewritten as well. Rules run in a fixed order and each rule rewrites all of its
//! non-overlapping matches before the next rule starts.
use anyhow::{Context, Result, bail};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::module::{Module, ModuleId};
use crate::util::{js_string_literal, normalize_line_endings};

/// `export [async] function[*] NAME(`
static EXPORT_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+((?:async\s+)?function\b\s*\*?\s*([A-Za-z_$][\w$]*)\s*\()")
        .expect("Invalid regex pattern for exported functions")
});

/// `export const|let|var NAME`
static EXPORT_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+((?:const|let|var)\s+([A-Za-z_$][\w$]*))")
        .expect("Invalid regex pattern for exported bindings")
});

/// `export class NAME`
static EXPORT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+(class\s+([A-Za-z_$][\w$]*))")
        .expect("Invalid regex pattern for exported classes")
});

/// `export { a, b };` with an optional `from` clause that is rejected
static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s*\{([^}]*)\}(\s*from\b)?\s*;?")
        .expect("Invalid regex pattern for export lists")
});

static EXPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+default\s+").expect("Invalid regex pattern for default exports")
});

/// `import { a, b as c } from "path";`
static IMPORT_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\{([^}]*)\}\s*from\s*["']([^"']+)["'];?"#)
        .expect("Invalid regex pattern for named imports")
});

/// `import name from "path";`
static IMPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s+([A-Za-z_$][\w$]*)\s+from\s*["']([^"']+)["'];?"#)
        .expect("Invalid regex pattern for default imports")
});

/// `import * as name from "path";`
static IMPORT_NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\*\s*as\s+([A-Za-z_$][\w$]*)\s+from\s*["']([^"']+)["'];?"#)
        .expect("Invalid regex pattern for namespace imports")
});

/// `import "path";`
static IMPORT_SIDE_EFFECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*["']([^"']+)["'];?"#)
        .expect("Invalid regex pattern for side-effect imports")
});

static REQUIRE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brequire\s*\(\s*["']([^"']+)["']\s*\)"#)
        .expect("Invalid regex pattern for require calls")
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*$").expect("Invalid regex pattern for identifiers")
});

/// `name` or `name as alias` inside an import list
static IMPORT_SPECIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*)\s+as\s+([A-Za-z_$][\w$]*)$")
        .expect("Invalid regex pattern for import specifiers")
});

/// Words that cannot appear as `exports.NAME = NAME;` bindings
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    "yield",
];

/// Marker left where `export default` used to be
pub const DEFAULT_EXPORT_MARKER: &str = "/* export default removed */ ";

/// Result of rewriting one module body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub source: String,
    pub exported_names: Vec<String>,
}

/// Transform a module read from disk into a [`Module`].
pub fn transform_module(id: ModuleId, raw_source: String) -> Result<Module> {
    let normalized = normalize_line_endings(raw_source.clone());
    let output = transform_source(&normalized)
        .with_context(|| format!("Failed to transform module {}", id))?;
    let dependencies = find_dependencies(&output.source);

    debug!(
        "Transformed {}: {} exports, {} dependencies",
        id,
        output.exported_names.len(),
        dependencies.len()
    );

    Ok(Module {
        id,
        raw_source,
        transformed_source: output.source,
        exported_names: output.exported_names,
        dependencies,
    })
}

/// Rewrite `source` into a body for a `function(require, module, exports)` factory.
pub fn transform_source(source: &str) -> Result<TransformOutput> {
    let mut transformer = SourceTransformer::default();

    let source = transformer.rewrite_declarations(&EXPORT_FUNCTION, source);
    let source = transformer.rewrite_declarations(&EXPORT_BINDING, &source);
    let source = transformer.rewrite_declarations(&EXPORT_CLASS, &source);
    let source = transformer.rewrite_export_lists(&source)?;
    let source = EXPORT_DEFAULT
        .replace_all(&source, DEFAULT_EXPORT_MARKER)
        .into_owned();

    let source = rewrite_named_imports(&source);
    let source = IMPORT_DEFAULT
        .replace_all(&source, |caps: &Captures<'_>| {
            format!("const {} = require({});", &caps[1], js_string_literal(&caps[2]))
        })
        .into_owned();
    let source = IMPORT_NAMESPACE
        .replace_all(&source, |caps: &Captures<'_>| {
            format!("const {} = require({});", &caps[1], js_string_literal(&caps[2]))
        })
        .into_owned();
    let mut source = IMPORT_SIDE_EFFECT
        .replace_all(&source, |caps: &Captures<'_>| {
            format!("require({});", js_string_literal(&caps[1]))
        })
        .into_owned();

    if !transformer.exported_names.is_empty() {
        source.push_str("\n\n// Exports\n");
        for name in &transformer.exported_names {
            source.push_str(&format!("exports.{name} = {name};\n"));
        }
    }

    Ok(TransformOutput {
        source,
        exported_names: transformer.exported_names,
    })
}

/// Collect the specifiers of every `require("...")` call, in source order
pub fn find_dependencies(source: &str) -> Vec<String> {
    REQUIRE_CALL
        .captures_iter(source)
        .map(|caps| caps[1].to_owned())
        .collect()
}

#[derive(Debug, Default)]
struct SourceTransformer {
    exported_names: Vec<String>,
}

impl SourceTransformer {
    /// Strip `export` from a declaration matched by `pattern`.
    ///
    /// The pattern's first group is the declaration kept verbatim, its second the bound name.
    fn rewrite_declarations(&mut self, pattern: &Regex, source: &str) -> String {
        pattern
            .replace_all(source, |caps: &Captures<'_>| {
                trace!("Exported declaration: {}", &caps[2]);
                self.exported_names.push(caps[2].to_owned());
                caps[1].to_owned()
            })
            .into_owned()
    }

    fn rewrite_export_lists(&mut self, source: &str) -> Result<String> {
        for caps in EXPORT_LIST.captures_iter(source) {
            if caps.get(2).is_some() {
                bail!(
                    "Unsupported re-export '{}': exporting from another module is not supported",
                    caps[0].trim()
                );
            }
            for entry in split_list(&caps[1]) {
                if !IDENTIFIER.is_match(entry) {
                    bail!(
                        "Unsupported export list entry '{}': only bare names are supported, renaming with 'as' is not",
                        entry
                    );
                }
                if RESERVED_WORDS.contains(&entry) {
                    bail!(
                        "Unsupported export list entry '{}': reserved words cannot be exported by name",
                        entry
                    );
                }
            }
        }

        Ok(EXPORT_LIST
            .replace_all(source, |caps: &Captures<'_>| {
                for entry in split_list(&caps[1]) {
                    trace!("Exported list entry: {}", entry);
                    self.exported_names.push(entry.to_owned());
                }
                ""
            })
            .into_owned())
    }
}

fn rewrite_named_imports(source: &str) -> String {
    IMPORT_NAMED
        .replace_all(source, |caps: &Captures<'_>| {
            let bindings: Vec<String> = split_list(&caps[1])
                .map(|entry| match IMPORT_SPECIFIER.captures(entry) {
                    Some(specifier) => format!("{}: {}", &specifier[1], &specifier[2]),
                    None => entry.to_owned(),
                })
                .collect();
            let path = js_string_literal(&caps[2]);
            if bindings.is_empty() {
                format!("const {{}} = require({path});")
            } else {
                format!("const {{ {} }} = require({path});", bindings.join(", "))
            }
        })
        .into_owned()
}

/// Comma-separated list entries, trimmed, with empty entries (trailing commas) dropped
fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}
