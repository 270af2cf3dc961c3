//! Generation request and result

use crate::archetype::ArchetypeCoordinates;
use crate::context::{keys, PropertyContext};
use crate::error::ArchetypeError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What to generate and where
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub archetype: ArchetypeCoordinates,
    pub output_directory: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub package: Option<String>,
    /// Extra properties; dotted keys are only visible to templates
    pub properties: BTreeMap<String, String>,
    /// Missing required properties were (or will be) prompted for
    pub interactive: bool,
}

impl GenerationRequest {
    pub fn new(archetype: ArchetypeCoordinates, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            archetype,
            output_directory: output_directory.into(),
            group_id: None,
            artifact_id: None,
            version: None,
            package: None,
            properties: BTreeMap::new(),
            interactive: false,
        }
    }

    #[must_use]
    pub fn with_coordinates(
        mut self,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.group_id = Some(group_id.into());
        self.artifact_id = Some(artifact_id.into());
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Request properties overlaid with the explicit coordinate fields
    pub fn initial_context(&self) -> PropertyContext {
        let mut context = PropertyContext::from_properties(self.properties.clone());
        let fields = [
            (keys::GROUP_ID, &self.group_id),
            (keys::ARTIFACT_ID, &self.artifact_id),
            (keys::VERSION, &self.version),
            (keys::PACKAGE, &self.package),
        ];
        for (key, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                context.insert(key, value);
            }
        }
        context
    }

    /// Copy resolved values back for downstream reporting
    pub(crate) fn write_back(&mut self, resolved: &PropertyContext) {
        let field = |key: &str| resolved.get(key).map(str::to_string);
        self.group_id = field(keys::GROUP_ID);
        self.artifact_id = field(keys::ARTIFACT_ID);
        self.version = field(keys::VERSION);
        self.package = field(keys::PACKAGE);
        self.properties = resolved
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }
}

/// A successfully generated project
#[derive(Debug, Clone)]
pub struct GeneratedProject {
    /// Directory holding the generated (or merged) build descriptor
    pub project_dir: PathBuf,
    /// Every file created, in write order
    pub written: Vec<PathBuf>,
    /// Existing files left untouched in merge mode
    pub skipped: Vec<PathBuf>,
    /// Final root module properties
    pub properties: BTreeMap<String, String>,
}

/// Outcome of one generation call; failures are carried, never thrown
#[derive(Debug)]
pub struct GenerationResult {
    outcome: Result<GeneratedProject, ArchetypeError>,
}

impl GenerationResult {
    pub fn success(project: GeneratedProject) -> Self {
        Self {
            outcome: Ok(project),
        }
    }

    pub fn failure(cause: ArchetypeError) -> Self {
        Self {
            outcome: Err(cause),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn cause(&self) -> Option<&ArchetypeError> {
        self.outcome.as_ref().err()
    }

    pub fn project(&self) -> Option<&GeneratedProject> {
        self.outcome.as_ref().ok()
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project().map(|p| p.project_dir.as_path())
    }

    pub fn into_result(self) -> Result<GeneratedProject, ArchetypeError> {
        self.outcome
    }
}

impl From<Result<GeneratedProject, ArchetypeError>> for GenerationResult {
    fn from(outcome: Result<GeneratedProject, ArchetypeError>) -> Self {
        Self { outcome }
    }
}
