//! Product configuration trait for CLI binaries
//!
//! This trait defines the interface a binary implements to configure where
//! archetypes come from and how the tool presents itself.

use std::path::Path;

/// Configuration trait for CLI products built on this library
///
/// Each product implements this trait to define:
/// - Product identity (name, display name)
/// - Archetype repository URL and its environment override
/// - Post-generation instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Default repository URL archetypes are fetched from
    fn default_repository_url(&self) -> &'static str;

    /// Environment variable name for overriding the repository URL
    fn repository_url_env(&self) -> &'static str;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, project_dir: &Path) -> Vec<String>;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
