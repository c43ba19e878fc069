use std::fs;
use std::io;
use std::path::Path;

use image::ImageFormat;
use upscaler_core::FileCandidate;

const UNKNOWN_MIME: &str = "application/octet-stream";

/// Reads a local file into a selection candidate.
pub fn read_candidate(path: &Path) -> io::Result<FileCandidate> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime = sniff_mime(&bytes)
        .or_else(|| {
            ImageFormat::from_path(path)
                .ok()
                .map(|format| format.to_mime_type())
        })
        .unwrap_or(UNKNOWN_MIME);
    Ok(FileCandidate {
        name,
        mime: mime.to_string(),
        bytes,
    })
}

/// Builds a candidate from downloaded bytes, trusting the magic bytes over
/// a missing or generic `Content-Type`.
pub fn candidate_from_download(
    name: Option<String>,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> FileCandidate {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"));
    let mime = declared
        .or_else(|| sniff_mime(&bytes).map(ToOwned::to_owned))
        .unwrap_or_else(|| UNKNOWN_MIME.to_string());
    FileCandidate {
        name: name.unwrap_or_else(|| "test-image".to_string()),
        mime,
        bytes,
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}
