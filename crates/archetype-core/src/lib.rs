//! Archetype Core - Shared library for generating projects from archetypes
//!
//! An archetype is a packaged project template: a descriptor plus a tree of
//! template resources. This library resolves the properties an archetype
//! needs, renders its resources into a new (or existing) project, merges
//! build descriptors and can reverse an existing project into an archetype.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - Property resolution, template rendering,
//!   fileset filtering, build descriptor editing
//! - **Layer 2: Workflow Orchestration** - `ArchetypeFetcher`,
//!   `ArchetypeGenerator` and `create_from_project`
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use archetype_core::{ArchetypeFetcher, ArchetypeGenerator, GenerationRequest};
//!
//! let fetcher = ArchetypeFetcher::from_local("archetypes".into(), "my-tool");
//! let mut request = GenerationRequest::new("com.acme:quickstart:1.0".parse()?, ".")
//!     .with_coordinates("com.acme", "shop", "1.0-SNAPSHOT");
//! let result = archetype_core::generate_archetype(&fetcher, &ArchetypeGenerator::new(), &mut request).await;
//! let project = result.into_result()?;
//! ```

pub mod archetype;
pub mod context;
pub mod creator;
pub mod error;
pub mod fileset;
pub mod generator;
pub mod pom;
pub mod product;
pub mod properties;
pub mod render;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use archetype::{
    build_jar, ArchetypeCoordinates, ArchetypeDescriptor, ArchetypeFetcher, ArchetypeKind,
    ArchetypePackage, ArchetypeSource, RequiredProperty,
};
pub use context::PropertyContext;
pub use creator::{create_from_project, CreateRequest, CreatedArchetype};
pub use error::{ArchetypeError, Result};
pub use generator::{
    generate_archetype, ArchetypeGenerator, GeneratedProject, GenerationRequest, GenerationResult,
    PostGenerationHook,
};
pub use product::ProductConfig;

#[cfg(feature = "tui")]
pub use tui::run;
