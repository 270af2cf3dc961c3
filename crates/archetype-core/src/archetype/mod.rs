//! Archetype packages: descriptors, inspection and location
//!
//! This module provides:
//! - Descriptor types for fileset and legacy archetypes
//! - Package inspection (kind, descriptor, resource listing, raw reads)
//! - Package location from remote repositories or local paths
//! - Packaging an exploded archetype directory into a jar

pub mod descriptor;
pub mod fetcher;
pub mod package;

pub use descriptor::{
    ArchetypeDescriptor, FileSet, LegacyDescriptor, LegacyFile, ModuleDescriptor, ModuleTree,
    RequiredProperty,
};
pub use fetcher::{ArchetypeCoordinates, ArchetypeFetcher, ArchetypeSource};
pub use package::{ArchetypeKind, ArchetypePackage};

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Package an exploded archetype directory into a jar
pub fn build_jar(archetype_dir: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    if !archetype_dir.is_dir() {
        anyhow::bail!("Archetype directory not found: {}", archetype_dir.display());
    }

    let package = ArchetypePackage::from_directory(archetype_dir)?;
    // refuse to package something that would not generate
    let kind = package
        .inspect()
        .with_context(|| format!("{} is not a valid archetype", archetype_dir.display()))?;

    let name = match &kind {
        ArchetypeKind::FileSet(d) if !d.name.is_empty() => d.name.clone(),
        ArchetypeKind::Legacy(d) if !d.id.is_empty() => d.id.clone(),
        _ => archetype_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archetype".to_string()),
    };
    let jar_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.jar", name)));

    print!("  {} {}...", "->".blue(), name);
    let bytes = package.to_zip_bytes()?;
    std::fs::write(&jar_path, &bytes)
        .with_context(|| format!("Failed to write {}", jar_path.display()))?;
    println!(" {} ({} bytes)", "done".green(), bytes.len());

    Ok(jar_path)
}
