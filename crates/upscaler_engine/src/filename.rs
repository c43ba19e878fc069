use sha2::{Digest, Sha256};

/// Portable, deterministic name for a saved result:
/// `{sanitized_input_stem}--{short_hash(job_id)}-upscaled.{ext}`.
///
/// `ext` is taken from the download URL path and defaults to `jpg`.
pub fn enhanced_filename(input_file: Option<&str>, job_id: &str, download_url: &str) -> String {
    let stem = input_file
        .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
        .unwrap_or("upscaled");
    let sanitized = sanitize_stem(stem);
    let hash = short_hash(job_id);
    let ext = url_extension(download_url).unwrap_or_else(|| "jpg".to_string());
    format!("{sanitized}--{hash}-upscaled.{ext}")
}

const MAX_STEM_CHARS: usize = 80;

/// Replaces characters that are invalid on common filesystems, collapses
/// `_` runs and caps the length. Never returns an empty or reserved name.
fn sanitize_stem(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().map(|c| if is_forbidden(c) { '_' } else { c }) {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches(|c: char| c == '_' || c == ' ' || c == '.');
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    if stem.is_empty() {
        stem.push_str("upscaled");
    }
    if is_device_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    c.is_control() || "\\/:*?\"<>|".contains(c)
}

/// DOS device names cannot be used as file stems on Windows.
fn is_device_name(stem: &str) -> bool {
    let upper = stem.to_ascii_uppercase();
    match upper.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => match (upper.get(..3), upper.get(3..)) {
            (Some("COM" | "LPT"), Some(digit)) => matches!(digit.as_bytes(), [b'1'..=b'9']),
            _ => false,
        },
    }
}

fn url_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

fn short_hash(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
