//! Archetype descriptor types and parsing
//!
//! Two descriptor formats exist:
//! - `archetype-metadata.xml` describes a fileset archetype (filesets, required
//!   properties, nested modules)
//! - `archetype.xml` describes a legacy archetype (flat lists of sources and resources)
//!
//! The XML shape is mapped by private `Raw*` structs; the engine only sees the
//! flattened domain types.

use crate::error::{ArchetypeError, Result};
use serde::{Deserialize, Serialize};

/// A property the archetype needs before it can be generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredProperty {
    pub key: String,
    /// Default value, may reference other properties as `${key}`
    pub default_value: Option<String>,
    /// Pattern the final value has to match
    pub validation_regex: Option<String>,
}

/// A group of template files sharing copy/render/packaging treatment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    /// Directory relative to the module root, e.g. `src/main/java`
    pub directory: String,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Relocate files under the package directory
    pub packaged: bool,
    /// Render through the template engine instead of copying bytes
    pub filtered: bool,
    pub encoding: Option<String>,
}

impl FileSet {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            packaged: false,
            filtered: false,
            encoding: None,
        }
    }
}

/// A sub-module of a fileset archetype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Module artifact id expression, may contain `${rootArtifactId}`
    pub id: String,
    /// Directory relative to the parent module, may contain `__rootArtifactId__`
    pub dir: String,
    pub name: String,
    pub required_properties: Vec<RequiredProperty>,
    pub file_sets: Vec<FileSet>,
    pub modules: Vec<ModuleDescriptor>,
}

/// Descriptor of a fileset archetype
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchetypeDescriptor {
    pub name: String,
    pub partial: bool,
    pub required_properties: Vec<RequiredProperty>,
    pub file_sets: Vec<FileSet>,
    pub modules: Vec<ModuleDescriptor>,
}

/// Shared view over the root descriptor and its modules
pub trait ModuleTree {
    fn file_sets(&self) -> &[FileSet];
    fn modules(&self) -> &[ModuleDescriptor];
    fn required_properties(&self) -> &[RequiredProperty];
}

impl ModuleTree for ArchetypeDescriptor {
    fn file_sets(&self) -> &[FileSet] {
        &self.file_sets
    }
    fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }
    fn required_properties(&self) -> &[RequiredProperty] {
        &self.required_properties
    }
}

impl ModuleTree for ModuleDescriptor {
    fn file_sets(&self) -> &[FileSet] {
        &self.file_sets
    }
    fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }
    fn required_properties(&self) -> &[RequiredProperty] {
        &self.required_properties
    }
}

impl ArchetypeDescriptor {
    /// Parse an `archetype-metadata.xml` document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let raw: RawDescriptor = quick_xml::de::from_str(xml)?;
        Ok(raw.into())
    }

    /// Serialize back into an `archetype-metadata.xml` document
    pub fn to_xml(&self) -> Result<String> {
        let raw = RawDescriptor::from(self);
        let body = quick_xml::se::to_string(&raw)
            .map_err(|e| ArchetypeError::wrap("Failed to serialize archetype descriptor", e))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", body))
    }
}

/// One file listed by a legacy descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFile {
    pub path: String,
    pub filtered: bool,
    pub encoding: Option<String>,
}

/// Descriptor of a legacy (`archetype.xml`) archetype
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyDescriptor {
    pub id: String,
    pub allow_partial: bool,
    pub sources: Vec<LegacyFile>,
    pub resources: Vec<LegacyFile>,
    pub test_sources: Vec<LegacyFile>,
    pub test_resources: Vec<LegacyFile>,
    pub site_resources: Vec<LegacyFile>,
}

impl LegacyDescriptor {
    /// Parse an `archetype.xml` document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let raw: RawLegacy = quick_xml::de::from_str(xml)?;
        Ok(raw.into())
    }
}

// --- XML mapping ---------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "archetype-descriptor")]
struct RawDescriptor {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@partial", default)]
    partial: bool,
    #[serde(
        rename = "requiredProperties",
        default,
        skip_serializing_if = "RawRequiredProperties::is_empty"
    )]
    required_properties: RawRequiredProperties,
    #[serde(rename = "fileSets", default, skip_serializing_if = "RawFileSets::is_empty")]
    file_sets: RawFileSets,
    #[serde(rename = "modules", default, skip_serializing_if = "RawModules::is_empty")]
    modules: RawModules,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawRequiredProperties {
    #[serde(rename = "requiredProperty", default)]
    items: Vec<RawRequiredProperty>,
}

impl RawRequiredProperties {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRequiredProperty {
    #[serde(rename = "@key")]
    key: String,
    #[serde(rename = "defaultValue", default, skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
    #[serde(rename = "validationRegex", default, skip_serializing_if = "Option::is_none")]
    validation_regex: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawFileSets {
    #[serde(rename = "fileSet", default)]
    items: Vec<RawFileSet>,
}

impl RawFileSets {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFileSet {
    #[serde(rename = "@filtered", default)]
    filtered: bool,
    #[serde(rename = "@packaged", default)]
    packaged: bool,
    #[serde(rename = "@encoding", default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
    #[serde(default)]
    directory: String,
    #[serde(default, skip_serializing_if = "RawIncludes::is_empty")]
    includes: RawIncludes,
    #[serde(default, skip_serializing_if = "RawExcludes::is_empty")]
    excludes: RawExcludes,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawIncludes {
    #[serde(default)]
    include: Vec<String>,
}

impl RawIncludes {
    fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawExcludes {
    #[serde(default)]
    exclude: Vec<String>,
}

impl RawExcludes {
    fn is_empty(&self) -> bool {
        self.exclude.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawModules {
    #[serde(rename = "module", default)]
    items: Vec<RawModule>,
}

impl RawModules {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawModule {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@dir")]
    dir: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(
        rename = "requiredProperties",
        default,
        skip_serializing_if = "RawRequiredProperties::is_empty"
    )]
    required_properties: RawRequiredProperties,
    #[serde(rename = "fileSets", default, skip_serializing_if = "RawFileSets::is_empty")]
    file_sets: RawFileSets,
    #[serde(rename = "modules", default, skip_serializing_if = "RawModules::is_empty")]
    modules: RawModules,
}

impl From<RawRequiredProperty> for RequiredProperty {
    fn from(raw: RawRequiredProperty) -> Self {
        Self {
            key: raw.key,
            default_value: raw.default_value,
            validation_regex: raw.validation_regex,
        }
    }
}

impl From<RawFileSet> for FileSet {
    fn from(raw: RawFileSet) -> Self {
        Self {
            directory: raw.directory.trim().trim_end_matches('/').to_string(),
            includes: raw.includes.include,
            excludes: raw.excludes.exclude,
            packaged: raw.packaged,
            filtered: raw.filtered,
            encoding: raw.encoding,
        }
    }
}

impl From<RawModule> for ModuleDescriptor {
    fn from(raw: RawModule) -> Self {
        Self {
            id: raw.id,
            dir: raw.dir,
            name: raw.name,
            required_properties: convert(raw.required_properties.items),
            file_sets: convert(raw.file_sets.items),
            modules: convert(raw.modules.items),
        }
    }
}

impl From<RawDescriptor> for ArchetypeDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        Self {
            name: raw.name,
            partial: raw.partial,
            required_properties: convert(raw.required_properties.items),
            file_sets: convert(raw.file_sets.items),
            modules: convert(raw.modules.items),
        }
    }
}

fn convert<R, T: From<R>>(items: Vec<R>) -> Vec<T> {
    items.into_iter().map(T::from).collect()
}

impl From<&RequiredProperty> for RawRequiredProperty {
    fn from(p: &RequiredProperty) -> Self {
        Self {
            key: p.key.clone(),
            default_value: p.default_value.clone(),
            validation_regex: p.validation_regex.clone(),
        }
    }
}

impl From<&FileSet> for RawFileSet {
    fn from(fs: &FileSet) -> Self {
        Self {
            filtered: fs.filtered,
            packaged: fs.packaged,
            encoding: fs.encoding.clone(),
            directory: fs.directory.clone(),
            includes: RawIncludes {
                include: fs.includes.clone(),
            },
            excludes: RawExcludes {
                exclude: fs.excludes.clone(),
            },
        }
    }
}

impl From<&ModuleDescriptor> for RawModule {
    fn from(m: &ModuleDescriptor) -> Self {
        Self {
            id: m.id.clone(),
            dir: m.dir.clone(),
            name: m.name.clone(),
            required_properties: RawRequiredProperties {
                items: m.required_properties.iter().map(Into::into).collect(),
            },
            file_sets: RawFileSets {
                items: m.file_sets.iter().map(Into::into).collect(),
            },
            modules: RawModules {
                items: m.modules.iter().map(Into::into).collect(),
            },
        }
    }
}

impl From<&ArchetypeDescriptor> for RawDescriptor {
    fn from(d: &ArchetypeDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            partial: d.partial,
            required_properties: RawRequiredProperties {
                items: d.required_properties.iter().map(Into::into).collect(),
            },
            file_sets: RawFileSets {
                items: d.file_sets.iter().map(Into::into).collect(),
            },
            modules: RawModules {
                items: d.modules.iter().map(Into::into).collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLegacy {
    #[serde(default)]
    id: String,
    #[serde(rename = "allowPartial", default)]
    allow_partial: bool,
    #[serde(default)]
    sources: RawLegacySources,
    #[serde(default)]
    resources: RawLegacyResources,
    #[serde(rename = "testSources", default)]
    test_sources: RawLegacySources,
    #[serde(rename = "testResources", default)]
    test_resources: RawLegacyResources,
    #[serde(rename = "siteResources", default)]
    site_resources: RawLegacyResources,
}

#[derive(Debug, Default, Deserialize)]
struct RawLegacySources {
    #[serde(default)]
    source: Vec<RawLegacyFile>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLegacyResources {
    #[serde(default)]
    resource: Vec<RawLegacyFile>,
}

#[derive(Debug, Deserialize)]
struct RawLegacyFile {
    #[serde(rename = "@filtered", default)]
    filtered: Option<bool>,
    #[serde(rename = "@encoding", default)]
    encoding: Option<String>,
    #[serde(rename = "$text")]
    path: String,
}

impl From<RawLegacyFile> for LegacyFile {
    fn from(raw: RawLegacyFile) -> Self {
        Self {
            path: raw.path.trim().to_string(),
            filtered: raw.filtered.unwrap_or(true),
            encoding: raw.encoding,
        }
    }
}

impl From<RawLegacy> for LegacyDescriptor {
    fn from(raw: RawLegacy) -> Self {
        Self {
            id: raw.id,
            allow_partial: raw.allow_partial,
            sources: convert(raw.sources.source),
            resources: convert(raw.resources.resource),
            test_sources: convert(raw.test_sources.source),
            test_resources: convert(raw.test_resources.resource),
            site_resources: convert(raw.site_resources.resource),
        }
    }
}
