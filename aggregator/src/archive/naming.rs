//! File names inside and of the archive

use crate::types::SearchTerm;

const MAX_TITLE_LEN: usize = 40;
const UNTITLED: &str = "untitled";

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`, keep 40 chars
pub fn sanitize_title(title: Option<&str>) -> String {
    match title {
        Some(title) => title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_TITLE_LEN)
            .collect(),
        None => UNTITLED.to_string(),
    }
}

/// File extension (with dot) for a declared content type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("png") {
        ".png"
    } else if content_type.contains("gif") {
        ".gif"
    } else if content_type.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

/// `<position>_<sanitized title><ext>`, position 1-based
pub fn entry_name(position: usize, title: Option<&str>, content_type: Option<&str>) -> String {
    format!(
        "{}_{}{}",
        position,
        sanitize_title(title),
        extension_for(content_type)
    )
}

/// `<term with whitespace runs as _>_images_<succeeded>of<total>.zip`
pub fn archive_file_name(term: &SearchTerm, succeeded: usize, total: usize) -> String {
    let stem = term.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_images_{}of{}.zip", stem, succeeded, total)
}
