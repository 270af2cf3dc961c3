//! Project generation from an archetype package
//!
//! One run moves through these stages:
//!
//! `Start -> ArchetypeResolved -> Configured -> {PartialWalk | CompleteWalk} -> PostScript -> Done`
//!
//! Any stage may fail. The failure is captured in the returned
//! [`GenerationResult`] rather than propagated to the caller.

pub mod hook;
pub mod request;
pub mod writer;

mod fileset;
mod legacy;

pub use hook::{HookContext, NoHook, PostGenerationHook, ScriptHook};
pub use request::{GeneratedProject, GenerationRequest, GenerationResult};
pub use writer::{write_new_file, ExistingFilePolicy, WriteLog, WriteOutcome};

use crate::archetype::{ArchetypeFetcher, ArchetypeKind, ArchetypePackage, RequiredProperty};
use crate::context::{keys, package_as_directory, PropertyContext};
use crate::error::{ArchetypeError, Result};
use crate::properties::{resolve_required_properties, with_builtin_properties};
use std::fmt;
use std::path::PathBuf;

/// Where a generation run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ArchetypeResolved,
    Configured,
    PartialWalk,
    CompleteWalk,
    PostScript,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ArchetypeResolved => "archetype-resolved",
            Self::Configured => "configured",
            Self::PartialWalk => "partial-walk",
            Self::CompleteWalk => "complete-walk",
            Self::PostScript => "post-script",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a walk produced, before the post-generation script runs
pub(crate) struct Generated {
    pub project_dir: PathBuf,
    pub context: PropertyContext,
    pub log: WriteLog,
}

pub(crate) fn required_value(context: &PropertyContext, key: &str) -> Result<String> {
    context
        .get_non_blank(key)
        .map(str::to_string)
        .ok_or_else(|| ArchetypeError::ArchetypeNotConfigured {
            missing: vec![key.to_string()],
        })
}

/// Resolve the root property context for `request`
///
/// Project coordinates are always required; `declared` adds the archetype's
/// own required properties. `packageInPathFormat` is derived from `package`.
pub fn configure(
    declared: &[RequiredProperty],
    request: &GenerationRequest,
) -> Result<PropertyContext> {
    let required = with_builtin_properties(declared);
    let context = resolve_required_properties(&required, &request.initial_context())?;
    let package_dir = package_as_directory(context.get(keys::PACKAGE).unwrap_or_default());
    Ok(context.with(keys::PACKAGE_IN_PATH_FORMAT, package_dir))
}

/// Required properties of a package, project coordinates included
pub fn required_properties(kind: &ArchetypeKind) -> Vec<RequiredProperty> {
    match kind {
        ArchetypeKind::FileSet(descriptor) => {
            with_builtin_properties(&descriptor.required_properties)
        }
        ArchetypeKind::Legacy(_) => with_builtin_properties(&[]),
    }
}

/// Drives one archetype package through generation
pub struct ArchetypeGenerator {
    hook: Box<dyn PostGenerationHook + Send + Sync>,
}

impl Default for ArchetypeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeGenerator {
    /// Generator running bundled scripts with [`ScriptHook`]
    pub fn new() -> Self {
        Self::with_hook(ScriptHook::default())
    }

    pub fn with_hook(hook: impl PostGenerationHook + Send + Sync + 'static) -> Self {
        Self {
            hook: Box::new(hook),
        }
    }

    /// Generate `package` as described by `request`
    ///
    /// On success the resolved coordinates and properties are written back
    /// into `request`.
    pub fn generate(
        &self,
        request: &mut GenerationRequest,
        package: &ArchetypePackage,
    ) -> GenerationResult {
        let mut stage = Stage::Start;
        match self.run(request, package, &mut stage) {
            Ok(project) => {
                tracing::info!(
                    dir = %project.project_dir.display(),
                    files = project.written.len(),
                    skipped = project.skipped.len(),
                    "project generated"
                );
                GenerationResult::success(project)
            }
            Err(cause) => {
                tracing::warn!(%stage, archetype = package.label(), error = %cause, "generation failed");
                GenerationResult::failure(cause)
            }
        }
    }

    fn run(
        &self,
        request: &mut GenerationRequest,
        package: &ArchetypePackage,
        stage: &mut Stage,
    ) -> Result<GeneratedProject> {
        let kind = package.inspect()?;
        advance(stage, Stage::ArchetypeResolved);

        let declared: &[RequiredProperty] = match &kind {
            ArchetypeKind::FileSet(descriptor) => &descriptor.required_properties,
            ArchetypeKind::Legacy(_) => &[],
        };
        let context = configure(declared, request)?;
        advance(stage, Stage::Configured);

        let output_directory = request.output_directory.clone();
        let generated = match &kind {
            ArchetypeKind::FileSet(descriptor) => {
                let walk = if descriptor.partial {
                    Stage::PartialWalk
                } else {
                    Stage::CompleteWalk
                };
                advance(stage, walk);
                fileset::generate(package, descriptor, context, &output_directory)?
            }
            ArchetypeKind::Legacy(descriptor) => {
                let walk = if legacy::merges_into(descriptor, &output_directory) {
                    Stage::PartialWalk
                } else {
                    Stage::CompleteWalk
                };
                advance(stage, walk);
                legacy::generate(package, descriptor, context, &output_directory)?
            }
        };

        let properties = generated.context.clone().into_map();
        if let Some(script) = package.post_generate_script() {
            advance(stage, Stage::PostScript);
            self.hook.run(
                script,
                &HookContext {
                    project_dir: &generated.project_dir,
                    properties: &properties,
                    request,
                },
            )?;
        }

        request.write_back(&generated.context);
        advance(stage, Stage::Done);
        Ok(GeneratedProject {
            project_dir: generated.project_dir,
            written: generated.log.written,
            skipped: generated.log.skipped,
            properties,
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "generation stage");
    *stage = next;
}

/// Locate the archetype named by `request` and generate it
///
/// Generation itself is blocking file I/O performed on the calling task.
pub async fn generate_archetype(
    fetcher: &ArchetypeFetcher,
    generator: &ArchetypeGenerator,
    request: &mut GenerationRequest,
) -> GenerationResult {
    match fetcher.fetch(&request.archetype).await {
        Ok(package) => generator.generate(request, &package),
        Err(cause) => {
            tracing::warn!(archetype = %request.archetype, error = %cause, "archetype not available");
            GenerationResult::failure(cause)
        }
    }
}
