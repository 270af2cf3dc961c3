//! Token substitution for output paths and file contents
//!
//! Two independent passes:
//! - [`path::substitute_path_tokens`] replaces `__key__` tokens in paths
//! - [`template::render`] evaluates `${key}` references in file contents
//!
//! Copied (unfiltered) files only ever go through the path pass.

pub mod path;
pub mod template;

pub use path::{substitute_path_tokens, PathSubstitution};
pub use template::{references, render, TemplateError};

use crate::context::PropertyContext;
use crate::error::{ArchetypeError, Result};

/// Character encodings a filtered file may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    /// Resolve a declared encoding name, defaulting to UTF-8
    pub fn from_label(label: Option<&str>) -> Result<Self> {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return Ok(Self::Utf8);
        };
        match label.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            _ => Err(ArchetypeError::failure(format!(
                "Unsupported file encoding '{}'",
                label
            ))),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| ArchetypeError::wrap("File is not valid UTF-8", e)),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(ArchetypeError::failure(format!(
                        "Non-ASCII byte at offset {} in US-ASCII file",
                        pos
                    )));
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 | Self::Ascii => {
                let limit = if self == Self::Latin1 { 0xFF } else { 0x7F };
                text.chars()
                    .map(|c| {
                        u8::try_from(u32::from(c))
                            .ok()
                            .filter(|b| u32::from(*b) <= limit)
                            .ok_or_else(|| {
                                ArchetypeError::failure(format!(
                                    "Character '{}' cannot be encoded as {:?}",
                                    c, self
                                ))
                            })
                    })
                    .collect()
            }
        }
    }
}

/// Render the contents of one filtered file
///
/// `name` only labels errors.
pub fn render_bytes(
    name: &str,
    bytes: &[u8],
    encoding: Option<&str>,
    context: &PropertyContext,
) -> Result<Vec<u8>> {
    let encoding = Encoding::from_label(encoding)?;
    let source = encoding
        .decode(bytes)
        .map_err(|e| ArchetypeError::wrap(format!("Failed to decode template {}", name), e))?;
    let rendered = render(&source, context)
        .map_err(|e| ArchetypeError::wrap(format!("Failed to render template {}", name), e))?;
    encoding.encode(&rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_labels() {
        assert_eq!(Encoding::from_label(None).unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_label(Some("UTF-8")).unwrap(), Encoding::Utf8);
        assert_eq!(
            Encoding::from_label(Some("ISO-8859-1")).unwrap(),
            Encoding::Latin1
        );
        assert!(Encoding::from_label(Some("EBCDIC")).is_err());
    }

    #[test]
    fn test_latin1_survives_rendering() {
        let ctx = PropertyContext::from_properties([("name", "caf\u{e9}")]);
        let out = render_bytes("a.txt", b"\xabmenu\xbb ${name}", Some("ISO-8859-1"), &ctx).unwrap();
        assert_eq!(out, b"\xabmenu\xbb caf\xe9");
    }

    #[test]
    fn test_render_failure_is_generation_failure() {
        let err = render_bytes("Broken.java", b"${oops", None, &PropertyContext::new()).unwrap_err();
        assert!(matches!(err, ArchetypeError::GenerationFailure { .. }));
        assert!(err.to_string().contains("Broken.java"));
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let err = render_bytes("bin.dat", &[0xff, 0xfe], None, &PropertyContext::new()).unwrap_err();
        assert!(err.to_string().contains("bin.dat"));
    }
}
