//! Required property resolution
//!
//! A required property takes its value from the context when one is set.
//! Otherwise its default value is rendered against the properties resolved so
//! far. Defaults may reference each other, so resolution iterates to a fixed
//! point; whatever is still pending after the last cycle is cyclic.

use crate::archetype::RequiredProperty;
use crate::context::{keys, PropertyContext};
use crate::error::{ArchetypeError, Result};
use crate::render;
use regex::Regex;

/// Upper bound on resolution passes for `pending` unresolved defaults.
///
/// Every productive pass settles at least one property, so one pass per
/// property plus a final no-progress pass is always enough.
pub fn max_transitive_cycles(pending: usize) -> usize {
    pending + 1
}

/// Default project version when none is requested
pub const DEFAULT_VERSION: &str = "1.0-SNAPSHOT";

fn builtin(key: &str, default_value: Option<&str>) -> RequiredProperty {
    RequiredProperty {
        key: key.to_string(),
        default_value: default_value.map(str::to_string),
        validation_regex: None,
    }
}

/// Project coordinates every archetype needs, followed by `declared`
///
/// A declared property with the same key replaces the built-in one, so an
/// archetype may give `package` or `version` its own default.
pub fn with_builtin_properties(declared: &[RequiredProperty]) -> Vec<RequiredProperty> {
    let package_default = format!("${{{}}}", keys::GROUP_ID);
    [
        builtin(keys::GROUP_ID, None),
        builtin(keys::ARTIFACT_ID, None),
        builtin(keys::VERSION, Some(DEFAULT_VERSION)),
        builtin(keys::PACKAGE, Some(&package_default)),
    ]
    .into_iter()
    .filter(|b| !declared.iter().any(|d| d.key == b.key))
    .chain(declared.iter().cloned())
    .collect()
}

/// Fill in every required property missing from `context`
///
/// Returns the extended context, or
/// - [`ArchetypeError::ArchetypeNotConfigured`] listing properties without a
///   value or whose value fails its validation pattern
/// - [`ArchetypeError::CyclicProperties`] when defaults reference each other
pub fn resolve_required_properties(
    required: &[RequiredProperty],
    context: &PropertyContext,
) -> Result<PropertyContext> {
    let mut resolved = context.clone();
    let mut missing = Vec::new();
    let mut pending: Vec<&RequiredProperty> = Vec::new();

    for property in required {
        if resolved.get_non_blank(&property.key).is_some() {
            continue;
        }
        if property.default_value.is_some() {
            pending.push(property);
        } else {
            missing.push(property.key.clone());
        }
    }

    for _ in 0..max_transitive_cycles(pending.len()) {
        if pending.is_empty() {
            break;
        }
        let mut still_pending = Vec::with_capacity(pending.len());
        for property in &pending {
            let default = property.default_value.as_deref().unwrap_or_default();
            let refs = render::references(default).map_err(|e| {
                ArchetypeError::wrap(
                    format!("Invalid default value for property '{}'", property.key),
                    e,
                )
            })?;
            let blocked = refs
                .iter()
                .any(|r| pending.iter().any(|p| &p.key == r) && !resolved.contains(r));
            if blocked {
                still_pending.push(*property);
                continue;
            }
            let value = render::render(default, &resolved).map_err(|e| {
                ArchetypeError::wrap(
                    format!("Invalid default value for property '{}'", property.key),
                    e,
                )
            })?;
            tracing::debug!(property = %property.key, %value, "using default value");
            resolved.insert(property.key.clone(), value);
        }
        if still_pending.len() == pending.len() {
            pending = still_pending;
            break;
        }
        pending = still_pending;
    }

    if !pending.is_empty() {
        return Err(ArchetypeError::CyclicProperties {
            keys: pending.iter().map(|p| p.key.clone()).collect(),
        });
    }

    for property in required {
        let Some(pattern) = &property.validation_regex else {
            continue;
        };
        let Some(value) = resolved.get(&property.key) else {
            continue;
        };
        if missing.contains(&property.key) {
            continue;
        }
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            ArchetypeError::wrap(
                format!("Invalid validation pattern for property '{}'", property.key),
                e,
            )
        })?;
        if !regex.is_match(value) {
            tracing::warn!(
                property = %property.key,
                value,
                pattern = %pattern,
                "value does not match its validation pattern"
            );
            missing.push(property.key.clone());
        }
    }

    if !missing.is_empty() {
        return Err(ArchetypeError::ArchetypeNotConfigured { missing });
    }
    Ok(resolved)
}

/// Required properties that have neither a value in `context` nor a default
pub fn unconfigured<'a>(
    required: &'a [RequiredProperty],
    context: &PropertyContext,
) -> Vec<&'a RequiredProperty> {
    required
        .iter()
        .filter(|p| context.get_non_blank(&p.key).is_none() && p.default_value.is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(key: &str, default: Option<&str>, regex: Option<&str>) -> RequiredProperty {
        RequiredProperty {
            key: key.to_string(),
            default_value: default.map(str::to_string),
            validation_regex: regex.map(str::to_string),
        }
    }

    #[test]
    fn test_builtin_coordinates() {
        let required = with_builtin_properties(&[]);
        let ctx = PropertyContext::from_properties([("groupId", "com.x"), ("artifactId", "proj")]);
        let out = resolve_required_properties(&required, &ctx).unwrap();
        assert_eq!(out.get("version"), Some(DEFAULT_VERSION));
        assert_eq!(out.get("package"), Some("com.x"));

        match resolve_required_properties(&required, &PropertyContext::new()) {
            Err(ArchetypeError::ArchetypeNotConfigured { missing }) => {
                assert_eq!(missing, vec!["groupId", "artifactId"])
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_declared_property_replaces_builtin() {
        let required = with_builtin_properties(&[prop("version", Some("0.1.0"), None)]);
        assert_eq!(required.len(), 4);
        let ctx = PropertyContext::from_properties([("groupId", "g"), ("artifactId", "a")]);
        let out = resolve_required_properties(&required, &ctx).unwrap();
        assert_eq!(out.get("version"), Some("0.1.0"));
    }

    #[test]
    fn test_context_value_wins_over_default() {
        let ctx = PropertyContext::from_properties([("service", "billing")]);
        let out = resolve_required_properties(&[prop("service", Some("x"), None)], &ctx).unwrap();
        assert_eq!(out.get("service"), Some("billing"));
    }

    #[test]
    fn test_transitive_defaults_resolve_in_any_order() {
        let ctx = PropertyContext::from_properties([("artifactId", "shop")]);
        let required = vec![
            prop("c", Some("${b}-c"), None),
            prop("b", Some("${a}-b"), None),
            prop("a", Some("${artifactId}-a"), None),
        ];
        let out = resolve_required_properties(&required, &ctx).unwrap();
        assert_eq!(out.get("a"), Some("shop-a"));
        assert_eq!(out.get("b"), Some("shop-a-b"));
        assert_eq!(out.get("c"), Some("shop-a-b-c"));
    }

    #[test]
    fn test_cyclic_defaults_are_reported() {
        let required = vec![
            prop("a", Some("${b}"), None),
            prop("b", Some("${a}"), None),
            prop("ok", Some("fine"), None),
        ];
        match resolve_required_properties(&required, &PropertyContext::new()) {
            Err(ArchetypeError::CyclicProperties { keys }) => assert_eq!(keys, vec!["a", "b"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let required = vec![prop("a", Some("x${a}"), None)];
        assert!(matches!(
            resolve_required_properties(&required, &PropertyContext::new()),
            Err(ArchetypeError::CyclicProperties { .. })
        ));
    }

    #[test]
    fn test_reference_to_unknown_key_stays_literal() {
        let required = vec![prop("a", Some("${nowhere}/a"), None)];
        let out = resolve_required_properties(&required, &PropertyContext::new()).unwrap();
        assert_eq!(out.get("a"), Some("${nowhere}/a"));
    }

    #[test]
    fn test_missing_without_default() {
        let ctx = PropertyContext::from_properties([("blank", "")]);
        let required = vec![prop("blank", None, None), prop("absent", None, None)];
        match resolve_required_properties(&required, &ctx) {
            Err(ArchetypeError::ArchetypeNotConfigured { missing }) => {
                assert_eq!(missing, vec!["blank", "absent"])
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(unconfigured(&required, &ctx).len(), 2);
    }

    #[test]
    fn test_validation_pattern_must_match_whole_value() {
        let ctx = PropertyContext::from_properties([("port", "80a")]);
        let required = vec![prop("port", None, Some("[0-9]+"))];
        assert!(matches!(
            resolve_required_properties(&required, &ctx),
            Err(ArchetypeError::ArchetypeNotConfigured { .. })
        ));

        let ctx = PropertyContext::from_properties([("port", "8080")]);
        assert!(resolve_required_properties(&required, &ctx).is_ok());
    }
}
