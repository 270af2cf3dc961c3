//! Property context fed to path substitution and template rendering
//!
//! A context is never mutated once generation starts walking modules: each
//! recursion level derives its own copy with [`PropertyContext::with`], so a
//! child can never leak its `artifactId` or `parentArtifactId` into a sibling.

use std::collections::BTreeMap;

/// Well-known property keys
pub mod keys {
    pub const GROUP_ID: &str = "groupId";
    pub const ARTIFACT_ID: &str = "artifactId";
    pub const VERSION: &str = "version";
    pub const PACKAGE: &str = "package";
    pub const PACKAGE_IN_PATH_FORMAT: &str = "packageInPathFormat";
    pub const ROOT_ARTIFACT_ID: &str = "rootArtifactId";
    pub const PARENT_ARTIFACT_ID: &str = "parentArtifactId";
}

/// Key -> value mapping seen by one module during generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyContext {
    values: BTreeMap<String, String>,
}

impl PropertyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of `key` unless it is absent or blank
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Set a value while the context is still being seeded
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Copy of this context with one key overridden
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut forked = self.clone();
        forked.insert(key, value);
        forked
    }

    /// Copy of this context with every pair in `overrides` applied
    #[must_use]
    pub fn with_all<I, K, V>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut forked = self.clone();
        for (k, v) in overrides {
            forked.insert(k, v);
        }
        forked
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }
}

/// `com.acme.app` -> `com/acme/app`
pub fn package_as_directory(package: &str) -> String {
    package.replace('.', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_leaves_original_untouched() {
        let parent = PropertyContext::from_properties([(keys::ARTIFACT_ID, "root")]);
        let child = parent.with(keys::ARTIFACT_ID, "child");
        assert_eq!(parent.get(keys::ARTIFACT_ID), Some("root"));
        assert_eq!(child.get(keys::ARTIFACT_ID), Some("child"));
    }

    #[test]
    fn test_get_non_blank() {
        let ctx = PropertyContext::from_properties([("blank", "  "), ("set", "x")]);
        assert_eq!(ctx.get_non_blank("blank"), None);
        assert_eq!(ctx.get_non_blank("missing"), None);
        assert_eq!(ctx.get_non_blank("set"), Some("x"));
    }

    #[test]
    fn test_package_as_directory() {
        assert_eq!(package_as_directory("com.acme"), "com/acme");
        assert_eq!(package_as_directory(""), "");
    }
}
