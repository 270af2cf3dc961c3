//! Legacy (`archetype.xml`) archetype generation
//!
//! Legacy descriptors list every template file by path. Sources and test
//! sources are relocated under the package directory below their source
//! root; everything else keeps its path.

use super::writer::{contained_path, ExistingFilePolicy, WriteLog};
use super::{required_value, Generated};
use crate::archetype::{ArchetypePackage, LegacyDescriptor, LegacyFile};
use crate::context::{keys, PropertyContext};
use crate::error::{ArchetypeError, IoContext, Result};
use crate::pom::{self, Pom, POM_FILE};
use crate::render::{render_bytes, substitute_path_tokens};
use std::fs;
use std::path::Path;

/// Whether the archetype overlays an existing project in `output_directory`
pub(crate) fn merges_into(descriptor: &LegacyDescriptor, output_directory: &Path) -> bool {
    descriptor.allow_partial && output_directory.join(POM_FILE).is_file()
}

pub(crate) fn generate(
    package: &ArchetypePackage,
    descriptor: &LegacyDescriptor,
    context: PropertyContext,
    output_directory: &Path,
) -> Result<Generated> {
    let artifact_id = required_value(&context, keys::ARTIFACT_ID)?;
    let context = context.with(keys::ROOT_ARTIFACT_ID, &artifact_id);
    let basedir_pom = output_directory.join(POM_FILE);
    let merge = merges_into(descriptor, output_directory);

    let (project_dir, policy) = if merge {
        (output_directory.to_path_buf(), ExistingFilePolicy::Warn)
    } else {
        (contained_path(output_directory, &artifact_id)?, ExistingFilePolicy::Fail)
    };
    if !merge && project_dir.join(POM_FILE).exists() {
        return Err(ArchetypeError::ProjectDirectoryExists(project_dir));
    }
    fs::create_dir_all(&project_dir).at("Failed to create directory", &project_dir)?;

    let mut log = WriteLog::default();
    let rendered = render_bytes(POM_FILE, package.read_resource(POM_FILE)?, None, &context)?;
    if merge {
        let xml = String::from_utf8(rendered)
            .map_err(|e| ArchetypeError::wrap("pom.xml is not valid UTF-8", e))?;
        pom::merge_into(&basedir_pom, &Pom::parse(&xml)?)?;
    } else {
        let pom_path = project_dir.join(POM_FILE);
        log.write(&pom_path, &rendered, policy)?;
        if basedir_pom.is_file() {
            pom::add_module(&basedir_pom, &artifact_id)?;
            pom::add_parent(&pom_path, &basedir_pom)?;
            tracing::info!(parent = %basedir_pom.display(), module = %artifact_id, "added module to parent project");
        }
    }

    let package_dir = context
        .get(keys::PACKAGE_IN_PATH_FORMAT)
        .unwrap_or_default()
        .to_string();
    let groups: [(&[LegacyFile], bool); 5] = [
        (&descriptor.sources, true),
        (&descriptor.resources, false),
        (&descriptor.test_sources, true),
        (&descriptor.test_resources, false),
        (&descriptor.site_resources, false),
    ];
    for (files, packaged) in groups {
        for file in files {
            let output = if packaged {
                packaged_path(&file.path, &package_dir)
            } else {
                file.path.trim_matches('/').to_string()
            };
            let output = substitute_path_tokens(&output, &context).path;
            let bytes = package.read_resource(&file.path)?;
            let contents = if file.filtered {
                render_bytes(&file.path, bytes, file.encoding.as_deref(), &context)?
            } else {
                bytes.to_vec()
            };
            log.write(&contained_path(&project_dir, &output)?, &contents, policy)?;
        }
    }

    Ok(Generated {
        project_dir,
        context,
        log,
    })
}

/// `src/main/java/App.java` -> `src/main/java/<package>/App.java`
///
/// The source root is `src/{main,test}/<language>` when the path follows that
/// convention, otherwise the file's own directory.
pub(crate) fn packaged_path(path: &str, package_dir: &str) -> String {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let conventional = segments.len() > 3
        && segments[0] == "src"
        && (segments[1] == "main" || segments[1] == "test");
    let root_len = if conventional { 3 } else { segments.len() - 1 };
    let (root, rest) = segments.split_at(root_len);

    [root.join("/"), package_dir.trim_matches('/').to_string(), rest.join("/")]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
