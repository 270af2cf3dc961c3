//! Archetype creation from an existing project
//!
//! The project's files are classified into filesets, copied below
//! `archetype-resources/` (packaged files lose their package directory) and
//! described by a generated `archetype-metadata.xml`. Filtered files get the
//! project's literal coordinates turned back into `${..}` references so the
//! archetype regenerates the same project for the same coordinates.

use crate::archetype::package::{METADATA_DESCRIPTOR, RESOURCES_ROOT};
use crate::archetype::ArchetypeDescriptor;
use crate::context::{keys, package_as_directory};
use crate::error::{ArchetypeError, IoContext, Result};
use crate::fileset::{classify, filter_files, ClassifyOptions};
use crate::generator::writer::{ExistingFilePolicy, WriteLog};
use crate::pom::{Pom, POM_FILE};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never copied into an archetype
const SKIPPED_DIRS: &[&str] = &["target", ".git", ".svn", ".hg", "CVS", ".idea"];

/// Files never copied into an archetype
const SKIPPED_FILES: &[&str] = &[".DS_Store"];

/// Which project to turn into an archetype, and how
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub project_dir: PathBuf,
    /// Directory receiving the exploded archetype
    pub archetype_dir: PathBuf,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub package: String,
    pub options: ClassifyOptions,
}

/// An exploded archetype written to disk
#[derive(Debug, Clone)]
pub struct CreatedArchetype {
    pub archetype_dir: PathBuf,
    pub descriptor: ArchetypeDescriptor,
    pub written: Vec<PathBuf>,
    /// Project files no fileset claims
    pub excluded: Vec<String>,
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace `value` by `replacement` where it is not part of a longer word
fn replace_delimited(text: &str, value: &str, replacement: &str) -> String {
    if value.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(value) {
        let before = rest[..pos].chars().next_back().or(out.chars().next_back());
        let after = rest[pos + value.len()..].chars().next();
        let delimited = !before.is_some_and(|c| is_identifier_char(c) || c == '.')
            && !after.is_some_and(is_identifier_char);

        out.push_str(&rest[..pos]);
        out.push_str(if delimited { replacement } else { value });
        rest = &rest[pos + value.len()..];
    }
    out.push_str(rest);
    out
}

/// Turn the project's literal coordinates back into property references
pub fn reverse_content(text: &str, request: &CreateRequest) -> String {
    let mut pairs = [
        (request.package.as_str(), keys::PACKAGE),
        (request.group_id.as_str(), keys::GROUP_ID),
        (request.artifact_id.as_str(), keys::ARTIFACT_ID),
        (request.version.as_str(), keys::VERSION),
    ];
    // longest first so `com.acme.app` is not eaten by `com.acme`
    pairs.sort_by_key(|(value, _)| std::cmp::Reverse(value.len()));

    pairs
        .iter()
        .fold(text.to_string(), |text, (value, key)| {
            replace_delimited(&text, value, &format!("${{{}}}", key))
        })
}

fn project_files(project_dir: &Path, archetype_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(project_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0
                || (e.path() != archetype_dir
                    && !(e.file_type().is_dir() && SKIPPED_DIRS.contains(&&*name)))
        });
    for entry in walker {
        let entry = entry
            .map_err(|e| ArchetypeError::wrap(format!("Failed to walk {}", project_dir.display()), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if SKIPPED_FILES.contains(&&*name) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(project_dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if relative != POM_FILE {
            files.push(relative);
        }
    }
    Ok(files)
}

fn pom_template(project_pom: &Path) -> Result<String> {
    let mut pom = Pom::read(project_pom)?;
    if !pom.modules().is_empty() {
        tracing::warn!(
            pom = %project_pom.display(),
            "multi-module project: modules are copied as plain directories"
        );
    }
    pom.replace_coordinates(
        &format!("${{{}}}", keys::GROUP_ID),
        &format!("${{{}}}", keys::ARTIFACT_ID),
        &format!("${{{}}}", keys::VERSION),
    );
    Ok(pom.to_xml())
}

/// Build an exploded archetype from `request.project_dir`
pub fn create_from_project(request: &CreateRequest) -> Result<CreatedArchetype> {
    let project_dir = &request.project_dir;
    if !project_dir.is_dir() {
        return Err(ArchetypeError::failure(format!(
            "Project directory not found: {}",
            project_dir.display()
        )));
    }
    let package_dir = package_as_directory(&request.package);
    let paths = project_files(project_dir, &request.archetype_dir)?;
    let classification = classify(&paths, &package_dir, &request.options);

    let mut claimed = BTreeSet::new();
    let templates: Vec<String> = classification
        .files
        .iter()
        .map(|f| f.template_path.clone())
        .collect();
    for file_set in &classification.file_sets {
        claimed.extend(filter_files("", file_set, &templates)?);
    }

    let resources_dir = request.archetype_dir.join(RESOURCES_ROOT);
    let mut log = WriteLog::default();
    let mut excluded = Vec::new();

    let project_pom = project_dir.join(POM_FILE);
    if project_pom.is_file() {
        let template = pom_template(&project_pom)?;
        log.write(
            &resources_dir.join(POM_FILE),
            template.as_bytes(),
            ExistingFilePolicy::Fail,
        )?;
    }

    for file in &classification.files {
        if !claimed.contains(&file.template_path) {
            tracing::warn!(file = %file.path, "file matches no fileset, excluded");
            excluded.push(file.path.clone());
            continue;
        }
        let source = project_dir.join(&file.path);
        let bytes = std::fs::read(&source).at("Failed to read", &source)?;
        let contents = if file.filtered {
            let text = String::from_utf8(bytes).map_err(|e| {
                ArchetypeError::wrap(format!("{} is not valid UTF-8", file.path), e)
            })?;
            reverse_content(&text, request).into_bytes()
        } else {
            bytes
        };
        log.write(
            &resources_dir.join(&file.template_path),
            &contents,
            ExistingFilePolicy::Fail,
        )?;
    }

    let descriptor = ArchetypeDescriptor {
        name: request.artifact_id.clone(),
        partial: false,
        required_properties: Vec::new(),
        file_sets: classification.file_sets,
        modules: Vec::new(),
    };
    let metadata = descriptor.to_xml()?;
    log.write(
        &request.archetype_dir.join(METADATA_DESCRIPTOR),
        metadata.as_bytes(),
        ExistingFilePolicy::Fail,
    )?;

    tracing::info!(
        archetype = %request.archetype_dir.display(),
        files = log.written.len(),
        filesets = descriptor.file_sets.len(),
        "archetype created"
    );
    Ok(CreatedArchetype {
        archetype_dir: request.archetype_dir.clone(),
        descriptor,
        written: log.written,
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ArchetypePackage;
    use crate::generator::{ArchetypeGenerator, GenerationRequest, NoHook};
    use std::fs;
    use tempfile::TempDir;

    fn create_request(project: &Path, out: &Path) -> CreateRequest {
        CreateRequest {
            project_dir: project.to_path_buf(),
            archetype_dir: out.to_path_buf(),
            group_id: "com.acme".to_string(),
            artifact_id: "shop".to_string(),
            version: "1.0".to_string(),
            package: "com.acme.shop".to_string(),
            options: ClassifyOptions::default(),
        }
    }

    fn write(root: &Path, path: &str, contents: &[u8]) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sample_project(root: &Path) {
        write(
            root,
            "pom.xml",
            b"<project>\n  <modelVersion>4.0.0</modelVersion>\n  <groupId>com.acme</groupId>\n  <artifactId>shop</artifactId>\n  <version>1.0</version>\n  <dependencies>\n    <dependency>\n      <groupId>org.x</groupId>\n      <artifactId>x</artifactId>\n      <version>1.0</version>\n    </dependency>\n  </dependencies>\n</project>\n",
        );
        write(
            root,
            "src/main/java/com/acme/shop/App.java",
            b"package com.acme.shop;\n\nimport com.acme.shopping.Cart;\n",
        );
        write(root, "src/main/resources/logo.png", b"\x89PNG com.acme.shop");
        write(root, "src/test/java/com/acme/shop/AppTest.java", b"package com.acme.shop;\n");
        write(root, "README.txt", b"shop 1.0 by com.acme\n");
        write(root, "target/classes/App.class", b"\xca\xfe");
    }

    #[test]
    fn test_replace_delimited_respects_word_boundaries() {
        assert_eq!(replace_delimited("shop shopping shop.", "shop", "X"), "X shopping X.");
        assert_eq!(replace_delimited("a.shop", "shop", "X"), "a.shop");
        assert_eq!(replace_delimited("", "shop", "X"), "");
    }

    #[test]
    fn test_reverse_content_prefers_longest_value() {
        let req = create_request(Path::new("p"), Path::new("o"));
        assert_eq!(
            reverse_content("package com.acme.shop; // com.acme", &req),
            "package ${package}; // ${groupId}"
        );
    }

    #[test]
    fn test_create_writes_resources_and_descriptor() {
        let project = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        sample_project(project.path());

        let created = create_from_project(&create_request(project.path(), out.path())).unwrap();
        assert!(created.excluded.is_empty());

        let resources = out.path().join("archetype-resources");
        let app = fs::read_to_string(resources.join("src/main/java/App.java")).unwrap();
        assert_eq!(app, "package ${package};\n\nimport ${groupId}.shopping.Cart;\n");
        assert_eq!(
            fs::read(resources.join("src/main/resources/logo.png")).unwrap(),
            b"\x89PNG com.acme.shop"
        );
        assert!(!resources.join("target").exists());

        let pom = fs::read_to_string(resources.join("pom.xml")).unwrap();
        assert!(pom.contains("<groupId>${groupId}</groupId>"));
        assert!(pom.contains("<version>${version}</version>"));
        // dependency coordinates are left alone
        assert!(pom.contains("<artifactId>x</artifactId>\n      <version>1.0</version>"));

        let metadata = fs::read_to_string(out.path().join(METADATA_DESCRIPTOR)).unwrap();
        let descriptor = ArchetypeDescriptor::from_xml(&metadata).unwrap();
        assert_eq!(descriptor, created.descriptor);
        assert!(descriptor
            .file_sets
            .iter()
            .any(|fs| fs.directory == "src/main/java" && fs.packaged && fs.filtered));
    }

    #[test]
    fn test_created_archetype_regenerates_project() {
        let project = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        sample_project(project.path());
        create_from_project(&create_request(project.path(), out.path())).unwrap();

        let archetype = ArchetypePackage::from_directory(out.path()).unwrap();
        let mut request = GenerationRequest::new("com.acme:shop-archetype:1.0".parse().unwrap(), target.path())
            .with_coordinates("org.demo", "store", "2.0")
            .with_package("org.demo.store");
        let result = ArchetypeGenerator::with_hook(NoHook).generate(&mut request, &archetype);
        assert!(result.is_success(), "{:?}", result.cause());

        let store = target.path().join("store");
        let app = fs::read_to_string(store.join("src/main/java/org/demo/store/App.java")).unwrap();
        assert!(app.starts_with("package org.demo.store;"));
        assert!(store.join("src/test/java/org/demo/store/AppTest.java").is_file());
        assert_eq!(
            fs::read_to_string(store.join("README.txt")).unwrap(),
            "store 2.0 by org.demo\n"
        );
        let pom = Pom::read(&store.join("pom.xml")).unwrap();
        assert_eq!(pom.coordinates().artifact_id.as_deref(), Some("store"));
    }

    #[test]
    fn test_existing_archetype_is_not_overwritten() {
        let project = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        sample_project(project.path());
        let request = create_request(project.path(), out.path());
        create_from_project(&request).unwrap();

        assert!(matches!(
            create_from_project(&request),
            Err(ArchetypeError::OutputFileExists(_))
        ));
    }

    #[test]
    fn test_missing_project_is_error() {
        let out = TempDir::new().unwrap();
        let request = create_request(&out.path().join("nope"), out.path());
        assert!(create_from_project(&request).is_err());
    }
}
