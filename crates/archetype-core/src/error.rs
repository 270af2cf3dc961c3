//! Error taxonomy for archetype generation
//!
//! Every fatal condition the engine can hit is one variant of [`ArchetypeError`].
//! Low-level failures (I/O, XML, zip, template rendering) are wrapped into
//! [`ArchetypeError::GenerationFailure`] with their original cause preserved.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ArchetypeError> = std::result::Result<T, E>;

/// Errors that abort archetype generation
#[derive(Debug, Error)]
pub enum ArchetypeError {
    /// The archetype coordinate resolves to nothing
    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    /// Required coordinate fields are missing
    #[error("Archetype not defined: missing {}", .0.join(", "))]
    ArchetypeNotDefined(Vec<String>),

    /// One or more required properties have no usable value
    #[error("Archetype is not fully configured: missing or invalid {}", .missing.join(", "))]
    ArchetypeNotConfigured { missing: Vec<String> },

    /// Default values referencing each other never settle
    #[error("Cyclic property references between {}", .keys.join(", "))]
    CyclicProperties { keys: Vec<String> },

    /// A project already exists where a complete archetype would be generated
    #[error("A project already exists in the directory {}", .0.display())]
    ProjectDirectoryExists(PathBuf),

    /// A partial archetype found no build descriptor to merge into
    #[error("This is a partial archetype and the build descriptor {} doesn't exist", .0.display())]
    PomFileExists(PathBuf),

    /// A generated file would overwrite an existing one
    #[error("Output file already exists: {}", .0.display())]
    OutputFileExists(PathBuf),

    /// The archetype contradicts the packaging of a descriptor it touches
    #[error("Invalid packaging: {0}")]
    InvalidPackaging(String),

    /// Catch-all for rendering, parsing and I/O failures mid-walk
    #[error("Archetype generation failed: {message}")]
    GenerationFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl ArchetypeError {
    /// Failure without an underlying cause
    pub fn failure(message: impl Into<String>) -> Self {
        Self::GenerationFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Failure wrapping an underlying cause
    pub fn wrap<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::GenerationFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<std::io::Error> for ArchetypeError {
    fn from(e: std::io::Error) -> Self {
        Self::wrap("I/O error", e)
    }
}

impl From<quick_xml::Error> for ArchetypeError {
    fn from(e: quick_xml::Error) -> Self {
        Self::wrap("Malformed XML", e)
    }
}

impl From<quick_xml::de::DeError> for ArchetypeError {
    fn from(e: quick_xml::de::DeError) -> Self {
        Self::wrap("Malformed archetype descriptor", e)
    }
}

impl From<zip::result::ZipError> for ArchetypeError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::wrap("Malformed archetype package", e)
    }
}

/// Attach a path to I/O failures, mirroring `anyhow::Context` for the taxonomy
pub(crate) trait IoContext<T> {
    fn at(self, action: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, action: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| ArchetypeError::wrap(format!("{} {}", action, path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_not_configured_lists_keys() {
        let err = ArchetypeError::ArchetypeNotConfigured {
            missing: vec!["groupId".to_string(), "package".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Archetype is not fully configured: missing or invalid groupId, package"
        );
    }

    #[test]
    fn test_wrapped_failure_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ArchetypeError = Err::<(), _>(io)
            .at("Failed to read", std::path::Path::new("a/b.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("a/b.txt"));
        assert_eq!(err.source().unwrap().to_string(), "gone");
    }
}
