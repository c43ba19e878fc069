use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::IntakePolicy;

/// A file offered by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The single accepted file plus its inline preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    /// `data:<mime>;base64,...` rendition of `bytes`.
    pub preview: String,
}

impl SelectedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeRejection {
    #[error("{mime:?} is not an image type")]
    NotAnImage { mime: String },
    #[error("file is empty")]
    Empty,
    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },
}

pub fn accept_file(
    candidate: FileCandidate,
    policy: &IntakePolicy,
) -> Result<SelectedFile, IntakeRejection> {
    let mime = candidate.mime.trim().to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return Err(IntakeRejection::NotAnImage { mime });
    }
    if candidate.bytes.is_empty() {
        return Err(IntakeRejection::Empty);
    }
    let size = candidate.bytes.len() as u64;
    if size > policy.max_bytes {
        return Err(IntakeRejection::TooLarge {
            size,
            max: policy.max_bytes,
        });
    }

    let preview = format!("data:{};base64,{}", mime, STANDARD.encode(&candidate.bytes));
    Ok(SelectedFile {
        name: candidate.name,
        mime,
        bytes: candidate.bytes,
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(mime: &str, bytes: &[u8]) -> FileCandidate {
        FileCandidate {
            name: "cat.png".to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn image_gets_data_url_preview() {
        let selected = accept_file(candidate("image/png", b"abc"), &IntakePolicy::default())
            .expect("accepted");
        assert_eq!(selected.preview, "data:image/png;base64,YWJj");
        assert_eq!(selected.size(), 3);
    }

    #[test]
    fn non_image_is_rejected() {
        let err = accept_file(candidate("text/plain", b"abc"), &IntakePolicy::default())
            .unwrap_err();
        assert_eq!(
            err,
            IntakeRejection::NotAnImage {
                mime: "text/plain".to_string()
            }
        );
    }

    #[test]
    fn oversize_is_rejected() {
        let policy = IntakePolicy { max_bytes: 2 };
        let err = accept_file(candidate("image/jpeg", b"abc"), &policy).unwrap_err();
        assert_eq!(err, IntakeRejection::TooLarge { size: 3, max: 2 });
    }
}
