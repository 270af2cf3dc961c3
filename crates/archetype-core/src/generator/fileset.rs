//! Fileset archetype generation
//!
//! Complete archetypes create `outputDirectory/artifactId` and walk the module
//! tree depth first in declaration order. Partial archetypes overlay the
//! output directory itself and merge into its existing build descriptor.

use super::writer::{contained_path, ExistingFilePolicy, WriteLog};
use super::{required_value, Generated};
use crate::archetype::{ArchetypeDescriptor, ArchetypePackage, FileSet, ModuleTree};
use crate::context::{keys, PropertyContext};
use crate::error::{ArchetypeError, IoContext, Result};
use crate::fileset::{fileset_root, filter_files, relative_to_fileset};
use crate::pom::{self, Pom, POM_FILE};
use crate::properties::resolve_required_properties;
use crate::render::{self, render_bytes, substitute_path_tokens};
use std::fs;
use std::path::Path;

/// Resources already laid out under the package directory
const PACKAGE_TOKEN: &str = "__packageInPathFormat__/";

pub(crate) fn generate(
    package: &ArchetypePackage,
    descriptor: &ArchetypeDescriptor,
    context: PropertyContext,
    output_directory: &Path,
) -> Result<Generated> {
    let artifact_id = required_value(&context, keys::ARTIFACT_ID)?;
    let context = context.with(keys::ROOT_ARTIFACT_ID, &artifact_id);
    let mut walk = ModuleWalk {
        package,
        resources: package.resources(),
        log: WriteLog::default(),
    };

    if descriptor.partial {
        let pom_path = output_directory.join(POM_FILE);
        if !pom_path.is_file() {
            return Err(ArchetypeError::PomFileExists(pom_path));
        }
        if !descriptor.modules.is_empty() {
            tracing::warn!(
                count = descriptor.modules.len(),
                "partial archetype declares modules, ignoring them"
            );
        }
        tracing::info!(dir = %output_directory.display(), "merging partial archetype into existing project");
        walk.merge_module(descriptor, output_directory, &context)?;
        return Ok(Generated {
            project_dir: output_directory.to_path_buf(),
            context,
            log: walk.log,
        });
    }

    let project_dir = contained_path(output_directory, &artifact_id)?;
    if project_dir.join(POM_FILE).exists() {
        return Err(ArchetypeError::ProjectDirectoryExists(project_dir));
    }
    if project_dir.exists() {
        tracing::warn!(dir = %project_dir.display(), "directory already exists, generating into it");
    }
    walk.module(descriptor, "", &project_dir, &context, true)?;
    Ok(Generated {
        project_dir,
        context,
        log: walk.log,
    })
}

struct ModuleWalk<'a> {
    package: &'a ArchetypePackage,
    resources: Vec<String>,
    log: WriteLog,
}

impl ModuleWalk<'_> {
    /// Materialize one module and, recursively, its children
    fn module(
        &mut self,
        module: &dyn ModuleTree,
        offset: &str,
        dir: &Path,
        context: &PropertyContext,
        first: bool,
    ) -> Result<()> {
        fs::create_dir_all(dir).at("Failed to create directory", dir)?;
        self.module_pom(offset, dir, context, first)?;
        self.file_sets(module.file_sets(), offset, dir, context, ExistingFilePolicy::Fail)?;

        let artifact_id = context.get(keys::ARTIFACT_ID).unwrap_or_default();
        let children_context = context.with(keys::PARENT_ARTIFACT_ID, artifact_id);

        for child in module.modules() {
            let child_dir = substitute_path_tokens(&child.dir, &children_context).path;
            let child_id = if child.id.trim().is_empty() {
                child_dir.clone()
            } else {
                render::render(&child.id, &children_context).map_err(|e| {
                    ArchetypeError::wrap(format!("Invalid module id '{}'", child.id), e)
                })?
            };
            let child_context = resolve_required_properties(
                child.required_properties(),
                &children_context.with(keys::ARTIFACT_ID, &child_id),
            )?;

            tracing::debug!(module = %child_id, dir = %child_dir, parent = artifact_id, "generating module");
            self.module(
                child,
                &fileset_root(offset, &child.dir),
                &contained_path(dir, &child_dir)?,
                &child_context,
                false,
            )?;
        }
        Ok(())
    }

    /// Partial archetypes: merge the descriptor, never overwrite files
    fn merge_module(
        &mut self,
        descriptor: &ArchetypeDescriptor,
        dir: &Path,
        context: &PropertyContext,
    ) -> Result<()> {
        if self.package.has_resource(POM_FILE) {
            let rendered = self.render_pom(POM_FILE, context)?;
            pom::merge_into(&dir.join(POM_FILE), &rendered)?;
        }
        self.file_sets(
            descriptor.file_sets(),
            "",
            dir,
            context,
            ExistingFilePolicy::Warn,
        )
    }

    fn render_pom(&self, template: &str, context: &PropertyContext) -> Result<Pom> {
        let rendered = render_bytes(
            template,
            self.package.read_resource(template)?,
            None,
            context,
        )?;
        let xml = String::from_utf8(rendered)
            .map_err(|e| ArchetypeError::wrap(format!("{} is not valid UTF-8", template), e))?;
        Pom::parse(&xml)
            .map_err(|e| ArchetypeError::wrap(format!("Invalid build descriptor template {}", template), e))
    }

    fn module_pom(
        &mut self,
        offset: &str,
        dir: &Path,
        context: &PropertyContext,
        first: bool,
    ) -> Result<()> {
        let template = fileset_root(offset, POM_FILE);
        if !self.package.has_resource(&template) {
            tracing::warn!(module = %dir.display(), "archetype has no build descriptor template for module");
            return Ok(());
        }
        let pom_path = dir.join(POM_FILE);
        let rendered = self.render_pom(&template, context)?;
        self.log
            .write(&pom_path, rendered.to_xml().as_bytes(), ExistingFilePolicy::Fail)?;

        let basedir_pom = dir.parent().map(|p| p.join(POM_FILE));
        if let Some(basedir_pom) = basedir_pom.filter(|p| first && p.is_file()) {
            let artifact_id = required_value(context, keys::ARTIFACT_ID)?;
            pom::add_module(&basedir_pom, &artifact_id)?;
            pom::add_parent(&pom_path, &basedir_pom)?;
            tracing::info!(parent = %basedir_pom.display(), module = %artifact_id, "added module to parent project");
        }
        Ok(())
    }

    fn file_sets(
        &mut self,
        file_sets: &[FileSet],
        offset: &str,
        dir: &Path,
        context: &PropertyContext,
        policy: ExistingFilePolicy,
    ) -> Result<()> {
        let package_dir = context
            .get(keys::PACKAGE_IN_PATH_FORMAT)
            .unwrap_or_default()
            .to_string();
        let pom_template = fileset_root(offset, POM_FILE);

        for file_set in file_sets {
            let files = filter_files(offset, file_set, &self.resources)?;
            let directory = substitute_path_tokens(&file_set.directory, context).path;
            let target = contained_path(dir, &directory)?;
            fs::create_dir_all(&target).at("Failed to create directory", &target)?;
            tracing::debug!(
                directory = %file_set.directory,
                files = files.len(),
                packaged = file_set.packaged,
                filtered = file_set.filtered,
                "processing fileset"
            );

            for resource in files {
                if resource == pom_template {
                    continue;
                }
                let Some(relative) = relative_to_fileset(&resource, offset, &file_set.directory)
                else {
                    continue;
                };
                let package_part = if file_set.packaged && !relative.starts_with(PACKAGE_TOKEN) {
                    package_dir.as_str()
                } else {
                    ""
                };
                let output = output_path(&file_set.directory, package_part, relative);
                let output = substitute_path_tokens(&output, context).path;

                let bytes = self.package.read_resource(&resource)?;
                let contents = if file_set.filtered {
                    render_bytes(&resource, bytes, file_set.encoding.as_deref(), context)?
                } else {
                    bytes.to_vec()
                };
                self.log.write(&contained_path(dir, &output)?, &contents, policy)?;
            }
        }
        Ok(())
    }
}

/// `directory/[package]/relative` with empty parts dropped
fn output_path(directory: &str, package_dir: &str, relative: &str) -> String {
    [directory, package_dir, relative]
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
