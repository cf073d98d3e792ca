use kube::core::{Expression, Selector};
use kyverno_policy_controller_core::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

/// Marks a `ConfigMap` as eligible for the watch-cache. Only the label's presence matters.
pub const LABEL_CACHE_KEY: &str = "cache.kyverno.io/enabled";

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label name pattern")
});

static PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("label prefix pattern")
});

/// Selects the objects that carry [`LABEL_CACHE_KEY`], whatever its value.
pub fn cache_selector() -> Result<Selector, ConfigError> {
    selector_for(LABEL_CACHE_KEY)
}

/// Selects the objects that carry the label `key`, whatever its value.
///
/// Fails if `key` is not a valid (optionally prefixed) label key.
pub fn selector_for(key: &str) -> Result<Selector, ConfigError> {
    validate_key(key)?;
    Ok(Selector::from(Expression::Exists(key.to_string())))
}

fn validate_key(key: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidLabelKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err(invalid("prefix part must be non-empty"));
        }
        if prefix.len() > 253 {
            return Err(invalid("prefix part must be no more than 253 characters"));
        }
        if !PREFIX.is_match(prefix) {
            return Err(invalid("prefix part must be a lowercase DNS subdomain"));
        }
    }

    if name.is_empty() {
        return Err(invalid("name part must be non-empty"));
    }
    if name.len() > 63 {
        return Err(invalid("name part must be no more than 63 characters"));
    }
    if !NAME.is_match(name) {
        return Err(invalid(
            "name part must consist of alphanumerics, '-', '_' or '.', and must start and end with an alphanumeric",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_selector_requires_label_presence() {
        let selector = cache_selector().expect("selector must build");
        assert_eq!(selector.to_string(), LABEL_CACHE_KEY);
    }

    #[test]
    fn valid_keys() {
        for key in ["enabled", "app.kubernetes.io/name", "example.com/a_b.c-d", "A1"] {
            assert_eq!(selector_for(key).expect(key).to_string(), key);
        }
    }

    #[test]
    fn invalid_keys() {
        let long = "n".repeat(64);
        for key in [
            "",
            "/name",
            "Example.com/name",
            "example.com/",
            "example.com/-name",
            "example.com/a/b",
            "name!",
            long.as_str(),
        ] {
            assert!(
                matches!(
                    selector_for(key),
                    Err(ConfigError::InvalidLabelKey { .. })
                ),
                "{key:?} must be rejected"
            );
        }
    }
}
