//! `__key__` token replacement in output paths

use crate::context::PropertyContext;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Two underscores, a key of non-underscore segments joined by single
/// underscores, two underscores. Tokens never span path separators.
static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__([^_/\\]+(?:_[^_/\\]+)*)__").expect("path token pattern is valid")
});

/// Outcome of substituting the tokens of one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSubstitution {
    pub path: String,
    /// Keys whose tokens were left in place, in order of first appearance
    pub unresolved: Vec<String>,
}

/// Replace every `__key__` token in `path` with its non-blank context value.
///
/// Tokens for absent or blank keys survive literally and are reported.
pub fn substitute_path_tokens(path: &str, context: &PropertyContext) -> PathSubstitution {
    let mut unresolved: Vec<String> = Vec::new();

    let replaced = PATH_TOKEN.replace_all(path, |caps: &Captures<'_>| {
        let key = &caps[1];
        match context.get_non_blank(key) {
            Some(value) => value.to_string(),
            None => {
                if !unresolved.iter().any(|k| k == key) {
                    unresolved.push(key.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    for key in &unresolved {
        tracing::warn!(
            property = %key,
            path,
            "property was not specified, so the token in the path is not being replaced"
        );
    }

    PathSubstitution {
        path: replaced.into_owned(),
        unresolved,
    }
}
