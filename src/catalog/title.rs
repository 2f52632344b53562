// Filename -> display title
// Used when a catalog source only knows raw filenames

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[-_\s]+").expect("separator pattern is valid"))
}

/// Strip the extension, turn `-`/`_` into spaces and capitalize each word.
///
/// `lofi_rainy-night.mp3` becomes `Lofi Rainy Night`.
pub fn format_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    separators()
        .split(stem)
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
