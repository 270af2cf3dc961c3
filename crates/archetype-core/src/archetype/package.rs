//! Archetype package inspection
//!
//! Packages are zip archives (jars) or exploded directories. Both are loaded
//! into the same in-memory path -> bytes map, so generation behaves the same
//! whatever the archetype was loaded from.

use super::descriptor::{ArchetypeDescriptor, LegacyDescriptor};
use crate::error::{ArchetypeError, IoContext, Result};
use crate::fileset::is_contained;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Root of the template tree inside a package
pub const RESOURCES_ROOT: &str = "archetype-resources";

/// Fileset archetype descriptor location
pub const METADATA_DESCRIPTOR: &str = "META-INF/maven/archetype-metadata.xml";

/// Legacy descriptor locations, in lookup order
pub const LEGACY_DESCRIPTORS: &[&str] = &["META-INF/maven/archetype.xml", "META-INF/archetype.xml"];

/// Optional script run once the project has been generated
pub const POST_GENERATE_SCRIPT: &str = "META-INF/archetype-post-generate.sh";

/// What kind of archetype a package holds, resolved once
#[derive(Debug, Clone)]
pub enum ArchetypeKind {
    FileSet(ArchetypeDescriptor),
    Legacy(LegacyDescriptor),
}

/// A loaded archetype package
#[derive(Debug, Clone)]
pub struct ArchetypePackage {
    label: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl ArchetypePackage {
    /// Build a package from raw entries (paths use `/` separators)
    pub fn from_entries<I, P>(label: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: Into<String>,
    {
        let files = entries
            .into_iter()
            .map(|(path, bytes)| (path.into().trim_start_matches('/').to_string(), bytes))
            .collect();
        Self {
            label: label.into(),
            files,
        }
    }

    /// Load a zip or jar file from disk
    pub fn from_zip_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ArchetypeError::UnknownArchetype(path.display().to_string()));
        }
        let bytes = std::fs::read(path).at("Failed to read archetype", path)?;
        Self::from_zip_bytes(&path.display().to_string(), &bytes)
    }

    /// Load a zip archive held in memory
    pub fn from_zip_bytes(label: &str, zip_bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(zip_bytes))?;
        let mut files = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if !is_contained(&name) {
                return Err(ArchetypeError::failure(format!(
                    "Archetype {} has an entry outside the archive root: '{}'",
                    label, name
                )));
            }
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        let files = strip_common_root(files);
        tracing::debug!(archetype = label, entries = files.len(), "loaded archetype zip");
        Ok(Self {
            label: label.to_string(),
            files,
        })
    }

    /// Load an exploded archetype directory
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ArchetypeError::UnknownArchetype(dir.display().to_string()));
        }
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ArchetypeError::wrap(format!("Failed to walk {}", dir.display()), e)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| ArchetypeError::wrap("Path outside archetype directory", e))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = std::fs::read(entry.path()).at("Failed to read", entry.path())?;
            files.insert(key, bytes);
        }
        Ok(Self {
            label: dir.display().to_string(),
            files,
        })
    }

    /// Human-readable origin of this package
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_fileset_archetype(&self) -> bool {
        self.files.contains_key(METADATA_DESCRIPTOR)
    }

    pub fn is_legacy_archetype(&self) -> bool {
        !self.is_fileset_archetype() && self.legacy_descriptor_path().is_some()
    }

    fn legacy_descriptor_path(&self) -> Option<&'static str> {
        LEGACY_DESCRIPTORS
            .iter()
            .copied()
            .find(|p| self.files.contains_key(*p))
    }

    /// Determine the archetype kind and parse its descriptor
    pub fn inspect(&self) -> Result<ArchetypeKind> {
        if self.is_fileset_archetype() {
            let xml = self.read_text(METADATA_DESCRIPTOR)?;
            return Ok(ArchetypeKind::FileSet(ArchetypeDescriptor::from_xml(&xml)?));
        }
        if let Some(path) = self.legacy_descriptor_path() {
            let xml = self.read_text(path)?;
            return Ok(ArchetypeKind::Legacy(LegacyDescriptor::from_xml(&xml)?));
        }
        Err(ArchetypeError::failure(format!(
            "{} is not an archetype: no {} or {} found",
            self.label,
            METADATA_DESCRIPTOR,
            LEGACY_DESCRIPTORS.join(" / ")
        )))
    }

    /// Every path under the resources root, relative to it, in sorted order
    pub fn resources(&self) -> Vec<String> {
        let prefix = format!("{}/", RESOURCES_ROOT);
        self.files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(str::to_string)
            .collect()
    }

    /// Read any path inside the package
    pub fn read(&self, path: &str) -> Result<&[u8]> {
        self.files.get(path).map(Vec::as_slice).ok_or_else(|| {
            ArchetypeError::failure(format!("'{}' not found in archetype {}", path, self.label))
        })
    }

    /// Read a path relative to the resources root
    pub fn read_resource(&self, path: &str) -> Result<&[u8]> {
        self.read(&format!("{}/{}", RESOURCES_ROOT, path))
    }

    pub fn has_resource(&self, path: &str) -> bool {
        self.files
            .contains_key(&format!("{}/{}", RESOURCES_ROOT, path))
    }

    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ArchetypeError::wrap(format!("{} is not valid UTF-8", path), e))
    }

    /// The bundled post-generation script, if any
    pub fn post_generate_script(&self) -> Option<&[u8]> {
        self.files.get(POST_GENERATE_SCRIPT).map(Vec::as_slice)
    }

    /// Write every entry into a deflated zip archive
    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        let mut zip_buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

            for (path, content) in &self.files {
                zip.start_file(path.as_str(), options)?;
                zip.write_all(content)?;
            }
            zip.finish()?;
        }
        Ok(zip_buffer)
    }
}

/// Archives built from a folder (e.g. GitHub downloads) nest everything under
/// one top-level directory; drop it when `META-INF` is not at the root.
fn strip_common_root(files: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, Vec<u8>> {
    if files.keys().any(|k| k.starts_with("META-INF/")) {
        return files;
    }
    let root = match files.keys().next().and_then(|k| k.split_once('/')) {
        Some((root, _)) => format!("{}/", root),
        None => return files,
    };
    if !files.keys().all(|k| k.starts_with(&root)) {
        return files;
    }
    files
        .into_iter()
        .map(|(k, v)| (k[root.len()..].to_string(), v))
        .collect()
}
