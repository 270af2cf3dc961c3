//! Fileset resolution
//!
//! Generation direction: [`filter_files`] picks the archetype resources a
//! fileset claims for one module.
//!
//! Creation direction: [`classify`] partitions the files of an existing
//! project into filesets (sources, resources, tests, site, other), deciding
//! packaged vs. unpackaged and filtered vs. copied per file.

use crate::archetype::FileSet;
use crate::error::{ArchetypeError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

/// Version-control and OS noise never treated as template content
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.svn/**",
    "**/.hg/**",
    "**/CVS/**",
    "**/.DS_Store",
];

/// `offset/directory` with empty parts dropped
pub fn fileset_root(module_offset: &str, directory: &str) -> String {
    [module_offset, directory]
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `relative` stays below whatever directory it is joined onto
pub fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Ant-style pattern rooted at `root`; a trailing `/` means "everything below"
fn anchored(root: &str, pattern: &str) -> String {
    let pattern = pattern.trim().trim_start_matches('/');
    let pattern = if pattern.ends_with('/') {
        format!("{}**", pattern)
    } else {
        pattern.to_string()
    };
    if root.is_empty() {
        pattern
    } else {
        format!("{}/{}", root, pattern)
    }
}

fn glob_set(patterns: impl IntoIterator<Item = String>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ArchetypeError::wrap(format!("Invalid fileset pattern '{}'", pattern), e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ArchetypeError::wrap("Invalid fileset patterns", e))
}

/// Resources under `module_offset/fileset.directory` matching an include
/// pattern and no exclude pattern, in the order of `resources`.
///
/// A fileset without includes claims everything under its directory.
pub fn filter_files(
    module_offset: &str,
    fileset: &FileSet,
    resources: &[String],
) -> Result<Vec<String>> {
    let root = fileset_root(module_offset, &fileset.directory);
    let includes: Vec<String> = if fileset.includes.is_empty() {
        vec![anchored(&root, "**")]
    } else {
        fileset.includes.iter().map(|p| anchored(&root, p)).collect()
    };
    let excludes = fileset
        .excludes
        .iter()
        .map(|p| anchored(&root, p))
        .chain(DEFAULT_EXCLUDES.iter().map(|p| p.to_string()));

    let includes = glob_set(includes)?;
    let excludes = glob_set(excludes)?;

    Ok(resources
        .iter()
        .filter(|r| includes.is_match(r.as_str()) && !excludes.is_match(r.as_str()))
        .cloned()
        .collect())
}

/// Path of `resource` below its fileset directory
pub fn relative_to_fileset<'a>(
    resource: &'a str,
    module_offset: &str,
    directory: &str,
) -> Option<&'a str> {
    let root = fileset_root(module_offset, directory);
    if root.is_empty() {
        return Some(resource);
    }
    resource
        .strip_prefix(root.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
}

// --- classification ------------------------------------------------------

/// Conventional role of a project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceClass {
    SourceMain,
    ResourceMain,
    SourceTest,
    ResourceTest,
    Site,
    Other,
}

/// Heuristics used when classifying project files
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Language directory names under `src/main` and `src/test`
    pub languages: Vec<String>,
    /// Extensions (or exact file names) rendered through the template engine
    pub filtered_extensions: Vec<String>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        let owned =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            languages: owned(&["java", "groovy", "csharp", "aspectj", "kotlin", "scala"]),
            filtered_extensions: owned(&[
                "java", "xml", "txt", "groovy", "cs", "mdo", "aj", "jsp", "gsp", "vm", "html",
                "xhtml", "properties", "kt", "scala", ".classpath", ".project",
            ]),
        }
    }
}

impl ClassifyOptions {
    fn is_filtered(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.filtered_extensions.iter().any(|ext| {
            if ext.starts_with('.') {
                name == ext.as_str()
            } else {
                extension(name) == Some(ext.as_str())
            }
        })
    }
}

fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext),
        _ => None,
    }
}

/// Role and fileset root of `path`
pub fn classify_path(path: &str, options: &ClassifyOptions) -> (ResourceClass, String) {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["src", phase @ ("main" | "test"), kind, ..] if segments.len() > 3 => {
            let root = format!("src/{}/{}", phase, kind);
            let is_main = *phase == "main";
            if *kind == "resources" {
                let class = if is_main {
                    ResourceClass::ResourceMain
                } else {
                    ResourceClass::ResourceTest
                };
                (class, root)
            } else if options.languages.iter().any(|l| l.as_str() == *kind) {
                let class = if is_main {
                    ResourceClass::SourceMain
                } else {
                    ResourceClass::SourceTest
                };
                (class, root)
            } else {
                (ResourceClass::Other, root)
            }
        }
        ["src", "site", _, ..] => (ResourceClass::Site, "src/site".to_string()),
        [_single] => (ResourceClass::Other, String::new()),
        [first, ..] => (ResourceClass::Other, first.to_string()),
        [] => (ResourceClass::Other, String::new()),
    }
}

/// One project file and where it lives inside the archetype resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub path: String,
    /// Path below `archetype-resources/`, package directory removed
    pub template_path: String,
    pub class: ResourceClass,
    pub filtered: bool,
    pub packaged: bool,
}

/// Files of a project grouped into filesets
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub file_sets: Vec<FileSet>,
    pub files: Vec<ClassifiedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    class: ResourceClass,
    root: String,
    packaged: bool,
    filtered: bool,
}

fn include_pattern(relative: &str, packaged: bool) -> String {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    let leaf = match extension(name) {
        Some(ext) => format!("*.{}", ext),
        None => name.to_string(),
    };
    match relative.split_once('/') {
        _ if packaged => format!("**/{}", leaf),
        Some((first, _)) => format!("{}/**/{}", first, leaf),
        None => leaf,
    }
}

/// Partition project files into filesets.
///
/// `package_dir` is the package in path form (`com/acme`); files below
/// `root/package_dir/` become packaged and lose that prefix.
pub fn classify(paths: &[String], package_dir: &str, options: &ClassifyOptions) -> Classification {
    let package_dir = package_dir.trim_matches('/');
    let mut groups: BTreeMap<GroupKey, BTreeSet<String>> = BTreeMap::new();
    let mut unpackaged_dirs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut files = Vec::new();

    for path in paths {
        let (class, root) = classify_path(path, options);
        let relative = if root.is_empty() {
            path.as_str()
        } else {
            &path[root.len() + 1..]
        };

        let packaged_rest = (class != ResourceClass::Other && !package_dir.is_empty())
            .then(|| relative.strip_prefix(package_dir))
            .flatten()
            .and_then(|rest| rest.strip_prefix('/'));
        let packaged = packaged_rest.is_some();
        let filtered = options.is_filtered(path);
        let relative = packaged_rest.unwrap_or(relative);

        if !packaged {
            if let Some((first, _)) = relative.split_once('/') {
                unpackaged_dirs
                    .entry(root.clone())
                    .or_default()
                    .insert(first.to_string());
            }
        }

        let template_path = if root.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", root, relative)
        };

        groups
            .entry(GroupKey {
                class,
                root: root.clone(),
                packaged,
                filtered,
            })
            .or_default()
            .insert(include_pattern(relative, packaged));

        files.push(ClassifiedFile {
            path: path.clone(),
            template_path,
            class,
            filtered,
            packaged,
        });
    }

    let file_sets = groups
        .into_iter()
        .map(|(key, includes)| {
            let excludes = if key.packaged {
                unpackaged_dirs
                    .get(&key.root)
                    .map(|dirs| dirs.iter().map(|d| format!("{}/**", d)).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            FileSet {
                directory: key.root,
                includes: includes.into_iter().collect(),
                excludes,
                packaged: key.packaged,
                filtered: key.filtered,
                encoding: key.filtered.then(|| "UTF-8".to_string()),
            }
        })
        .collect();

    Classification { file_sets, files }
}
