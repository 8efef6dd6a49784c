//! Game title derivation from generated markdown.

use std::sync::OnceLock;

use regex::Regex;

/// First level-2 heading, up to an opening parenthesis or end of line.
fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^##[ \t]+(.+?)(?:[ \t]*\(|[ \t]*$)").expect("static heading pattern")
    })
}

/// Title taken from the first `## Heading`, if there is one.
///
/// `"## Catan (1995)"` yields `"Catan"`.
pub fn title_from_markdown(markdown: &str) -> Option<String> {
    heading_pattern()
        .captures(markdown)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Filename with a trailing `.pdf` (any case) removed.
pub fn strip_pdf_extension(filename: &str) -> &str {
    let len = filename.len();
    if len >= 4 && filename.is_char_boundary(len - 4) && filename[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        &filename[..len - 4]
    } else {
        filename
    }
}

/// Title for a new record: the first level-2 heading, else the first source
/// filename without its extension, else `"Untitled"`.
pub fn derive_title(markdown: &str, first_filename: &str) -> String {
    if let Some(title) = title_from_markdown(markdown) {
        return title;
    }
    let stem = strip_pdf_extension(first_filename).trim();
    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}
