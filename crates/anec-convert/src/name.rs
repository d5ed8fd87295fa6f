//! Model names for generated files and symbols
//!
//! The name ends up in `<name>.anec`, `anec_<name>.h` and C identifiers such
//! as `_binary_<name>_anec_start`, so it has to be a valid lowercase C
//! identifier.

use std::path::Path;

/// Used when nothing identifier-like survives sanitizing.
pub const DEFAULT_NAME: &str = "model";

/// Reduce `raw` to `[a-z_][a-z0-9_]*`.
///
/// Characters outside `[0-9A-Za-z_]` are dropped, then any leading run that
/// is not a letter or underscore, then the rest is lowercased.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .skip_while(|c| !(c.is_ascii_alphabetic() || *c == '_'))
        .collect::<String>()
        .to_ascii_lowercase();

    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}

/// Sanitized file stem of `path`.
#[must_use]
pub fn name_from_path(path: &Path) -> String {
    sanitize_name(
        &path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default(),
    )
}
