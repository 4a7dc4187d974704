//! Container repair
//!
//! Chunked encoders write the WebM/Matroska header before they know how long
//! the recording will be, so the `Info/Duration` field is missing or zero.
//! This module patches it after the fact as a pure transformation over bytes.

pub mod duration;
pub mod ebml;

pub use duration::{probe_duration, repair_duration, DurationPatch};

use thiserror::Error;

/// Container kinds the repair knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// WebM or Matroska, both EBML based
    Ebml,
    /// Anything else, passed through untouched
    Opaque,
}

impl ContainerKind {
    /// Classify a MIME type such as `video/webm;codecs=vp8`
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split([';', ','])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "video/webm" | "audio/webm" | "video/x-matroska" | "audio/x-matroska" | "video/vp8" => {
                ContainerKind::Ebml
            }
            _ => ContainerKind::Opaque,
        }
    }
}

/// Container parsing and patching errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    #[error("Truncated data at offset {offset}")]
    Truncated { offset: usize },

    #[error("Invalid variable-length integer at offset {offset}")]
    InvalidVint { offset: usize },

    #[error("Could not find {0} element")]
    MarkerNotFound(&'static str),

    #[error("{0} element has unknown size")]
    UnknownSize(&'static str),

    #[error("{0} size does not fit in its existing field")]
    SizeOverflow(&'static str),

    #[error("Unsupported float width: {0} bytes")]
    UnsupportedFloatWidth(u64),

    #[error("Invalid payload at offset {offset}: {reason}")]
    InvalidPayload { offset: usize, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_kind_from_mime() {
        assert_eq!(ContainerKind::from_mime("video/webm"), ContainerKind::Ebml);
        assert_eq!(ContainerKind::from_mime("video/webm;codecs=vp8"), ContainerKind::Ebml);
        assert_eq!(ContainerKind::from_mime("video/webm,codecs=vp9"), ContainerKind::Ebml);
        assert_eq!(
            ContainerKind::from_mime("video/x-matroska;codecs=avc1"),
            ContainerKind::Ebml
        );
        assert_eq!(ContainerKind::from_mime("video/mpeg"), ContainerKind::Opaque);
    }
}
