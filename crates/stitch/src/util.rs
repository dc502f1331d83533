use cow_utils::CowUtils;
use std::path::{Component, Path};

/// Normalize line endings to LF (\n) for cross-platform consistency
/// This keeps bundles byte-identical regardless of the platform the sources were checked out on
pub fn normalize_line_endings(content: String) -> String {
    let content = match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_owned(),
        None => content,
    };
    content
        .cow_replace("\r\n", "\n")
        .cow_replace('\r', "\n")
        .into_owned()
}

/// Join the components of a relative path with forward slashes.
///
/// Returns `None` if the path escapes its root, is absolute, or is not valid UTF-8.
pub fn relative_path_to_slash(relative_path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Render `value` as a double-quoted JavaScript string literal
pub fn js_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
