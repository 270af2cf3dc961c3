//! Build descriptor (`pom.xml`) editing
//!
//! Generated descriptors are merged into existing ones instead of replacing
//! them. Existing entries always win: a dependency or plugin already present
//! keeps its version and configuration, and only entries the existing file
//! lacks are appended. Everything else in the existing file is written back
//! untouched.

pub mod xml;

pub use xml::{Document, Element, Node};

use crate::error::{ArchetypeError, IoContext, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Conventional build descriptor file name at each module root
pub const POM_FILE: &str = "pom.xml";

/// Group assumed for plugins that omit `<groupId>`
const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// Coordinates declared by (or inherited into) a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomCoordinates {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

/// A parsed build descriptor
#[derive(Debug, Clone)]
pub struct Pom {
    document: Document,
}

impl Pom {
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self {
            document: Document::parse(xml)?,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path).at("Failed to read", path)?;
        Self::parse(&xml)
            .map_err(|e| ArchetypeError::wrap(format!("Invalid build descriptor {}", path.display()), e))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml()).at("Failed to write", path)
    }

    pub fn to_xml(&self) -> String {
        self.document.to_xml()
    }

    pub fn root(&self) -> &Element {
        &self.document.root
    }

    /// groupId and version fall back to the `<parent>` declaration
    pub fn coordinates(&self) -> PomCoordinates {
        let root = self.root();
        let parent = root.child("parent");
        let inherited = |name: &str| {
            root.child_text(name)
                .or_else(|| parent.and_then(|p| p.child_text(name)))
        };
        PomCoordinates {
            group_id: inherited("groupId"),
            artifact_id: root.child_text("artifactId"),
            version: inherited("version"),
        }
    }

    pub fn packaging(&self) -> String {
        self.root()
            .child_text("packaging")
            .unwrap_or_else(|| "jar".to_string())
    }

    pub fn modules(&self) -> Vec<String> {
        self.root()
            .child("modules")
            .map(|m| m.children_named("module").filter_map(Element::text).collect())
            .unwrap_or_default()
    }

    /// Replace the project's own coordinates; inherited ones stay inherited
    pub fn replace_coordinates(&mut self, group_id: &str, artifact_id: &str, version: &str) {
        let root = &mut self.document.root;
        for (name, value) in [
            ("groupId", group_id),
            ("artifactId", artifact_id),
            ("version", version),
        ] {
            if root.child(name).is_some() {
                root.set_child_text(name, value, 0);
            }
        }
    }

    /// Append `module_id` to `<modules>`; false when it is already listed
    pub fn add_module(&mut self, module_id: &str) -> Result<bool> {
        let packaging = self.packaging();
        if packaging != "pom" {
            return Err(ArchetypeError::InvalidPackaging(format!(
                "Unable to add module '{}' to a project of packaging type '{}', expected 'pom'",
                module_id, packaging
            )));
        }
        if self.modules().iter().any(|m| m == module_id) {
            return Ok(false);
        }
        self.document
            .root
            .ensure_child("modules", 0)
            .append_child(Element::with_text("module", module_id), 1);
        Ok(true)
    }

    /// Point `<parent>` at `parent`, creating the element after `<modelVersion>`
    pub fn set_parent(&mut self, parent: &PomCoordinates) -> Result<()> {
        let (Some(group_id), Some(artifact_id), Some(version)) =
            (&parent.group_id, &parent.artifact_id, &parent.version)
        else {
            return Err(ArchetypeError::failure(
                "Parent descriptor does not declare groupId, artifactId and version",
            ));
        };

        let root = &mut self.document.root;
        match root.child_mut("parent") {
            Some(existing) => {
                existing.set_child_text("groupId", group_id, 1);
                existing.set_child_text("artifactId", artifact_id, 1);
                existing.set_child_text("version", version, 1);
            }
            None => {
                let mut element = Element::new("parent");
                element.append_child(Element::with_text("groupId", group_id), 1);
                element.append_child(Element::with_text("artifactId", artifact_id), 1);
                element.append_child(Element::with_text("version", version), 1);
                root.insert_child_after("modelVersion", element, 0);
            }
        }
        Ok(())
    }

    /// Union `generated` into this descriptor, keeping existing entries
    pub fn merge(&mut self, generated: &Pom) {
        for section in SECTIONS {
            merge_section(&mut self.document.root, generated.root(), section);
        }
    }
}

/// A keyed list inside a descriptor, e.g. `build/plugins/plugin`
struct Section {
    path: &'static [&'static str],
    item: Option<&'static str>,
    key: fn(&Element) -> String,
}

fn dependency_key(e: &Element) -> String {
    format!(
        "{}:{}",
        e.child_text("groupId").unwrap_or_default(),
        e.child_text("artifactId").unwrap_or_default()
    )
}

fn plugin_key(e: &Element) -> String {
    format!(
        "{}:{}",
        e.child_text("groupId")
            .unwrap_or_else(|| DEFAULT_PLUGIN_GROUP.to_string()),
        e.child_text("artifactId").unwrap_or_default()
    )
}

fn text_key(e: &Element) -> String {
    e.text().unwrap_or_default()
}

fn name_key(e: &Element) -> String {
    e.name.clone()
}

const SECTIONS: &[Section] = &[
    Section {
        path: &["dependencies"],
        item: Some("dependency"),
        key: dependency_key,
    },
    Section {
        path: &["dependencyManagement", "dependencies"],
        item: Some("dependency"),
        key: dependency_key,
    },
    Section {
        path: &["build", "plugins"],
        item: Some("plugin"),
        key: plugin_key,
    },
    Section {
        path: &["build", "pluginManagement", "plugins"],
        item: Some("plugin"),
        key: plugin_key,
    },
    Section {
        path: &["reporting", "plugins"],
        item: Some("plugin"),
        key: plugin_key,
    },
    Section {
        path: &["modules"],
        item: Some("module"),
        key: text_key,
    },
    // any child element, keyed by its name
    Section {
        path: &["properties"],
        item: None,
        key: name_key,
    },
];

fn find_path<'a>(root: &'a Element, path: &[&str]) -> Option<&'a Element> {
    path.iter().try_fold(root, |e, name| e.child(name))
}

fn section_items<'a>(section: &'a Element, item: Option<&'a str>) -> Vec<&'a Element> {
    match item {
        Some(name) => section.children_named(name).collect(),
        None => section.elements().collect(),
    }
}

fn merge_section(existing: &mut Element, generated: &Element, section: &Section) {
    let Some(source) = find_path(generated, section.path) else {
        return;
    };

    let known: BTreeSet<String> = find_path(existing, section.path)
        .map(|target| {
            section_items(target, section.item)
                .into_iter()
                .map(section.key)
                .collect()
        })
        .unwrap_or_default();

    let mut seen = known.clone();
    let mut additions: Vec<Element> = Vec::new();
    for item in section_items(source, section.item) {
        let key = (section.key)(item);
        if known.contains(&key) {
            tracing::debug!(entry = %key, "keeping existing entry");
        } else if seen.insert(key) {
            additions.push(item.clone());
        }
    }
    if additions.is_empty() {
        return;
    }

    let mut target = existing;
    let mut depth = 0;
    for name in section.path {
        target = target.ensure_child(name, depth);
        depth += 1;
    }
    for item in additions {
        tracing::debug!(
            section = %section.path.join("/"),
            entry = %(section.key)(&item),
            "merging entry"
        );
        target.append_child(item, depth);
    }
}

/// Merge the descriptor at `generated_path` into the one at `existing_path`
///
/// Dependencies, managed dependencies, build, managed and reporting plugins,
/// modules and properties are unioned by identity; the existing file wins on
/// every collision. The result is written back to `existing_path`.
pub fn merge_descriptors(existing_path: &Path, generated_path: &Path) -> Result<()> {
    let generated = Pom::read(generated_path)?;
    merge_into(existing_path, &generated)
}

/// Same as [`merge_descriptors`] for a descriptor rendered in memory
pub fn merge_into(existing_path: &Path, generated: &Pom) -> Result<()> {
    let mut existing = Pom::read(existing_path)?;
    existing.merge(generated);
    existing.write(existing_path)?;
    tracing::info!(path = %existing_path.display(), "merged build descriptor");
    Ok(())
}

/// Add `module_id` to the modules of the descriptor at `parent_path`
///
/// Returns false when the module was already listed. Fails with
/// [`ArchetypeError::InvalidPackaging`] unless the parent has `pom` packaging.
pub fn add_module(parent_path: &Path, module_id: &str) -> Result<bool> {
    let mut parent = Pom::read(parent_path)?;
    let added = parent.add_module(module_id)?;
    if added {
        parent.write(parent_path)?;
        tracing::debug!(module = module_id, parent = %parent_path.display(), "added module");
    }
    Ok(added)
}

/// Set the parent reference of the descriptor at `child_path` to the
/// coordinates of the descriptor at `parent_path`
pub fn add_parent(child_path: &Path, parent_path: &Path) -> Result<()> {
    let parent = Pom::read(parent_path)?.coordinates();
    let mut child = Pom::read(child_path)?;
    child.set_parent(&parent)?;
    child.write(child_path)
}
