use std::path::Path;

/// Fallback for extensions outside the table.
pub const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("js", "application/x-javascript"),
    ("webp", "image/webp"),
];

/// Looks up the content type for a file path by its extension.
///
/// Returns `None` for a missing or unknown extension; callers decide how to
/// fall back.
pub fn from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
