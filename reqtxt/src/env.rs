//! `${VAR}` placeholder expansion.
//!
//! Expansion is never part of parsing; it runs on request, typically when
//! the resolver loads an included file.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder pattern"));

/// What to do with a placeholder whose variable is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnMissing {
    /// Leave `${NAME}` in the text
    #[default]
    KeepLiteral,
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("Environment variable {name} is not set")]
    MissingVariable { name: String },
}

/// Replace every `${NAME}` using `lookup`
pub fn expand(
    text: &str,
    lookup: impl Fn(&str) -> Option<String>,
    on_missing: OnMissing,
) -> Result<String, ExpandError> {
    let mut missing = None;

    let expanded = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                if missing.is_none() {
                    missing = Some(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    match missing {
        Some(name) if on_missing == OnMissing::Error => {
            Err(ExpandError::MissingVariable { name })
        }
        Some(name) => {
            tracing::debug!(variable = %name, "leaving unset placeholder in place");
            Ok(expanded.into_owned())
        }
        None => Ok(expanded.into_owned()),
    }
}

/// Look a variable up in the process environment
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("INDEX_HOST", "pypi.internal"), ("TOKEN", "s3cret")])
    }

    fn lookup(name: &str) -> Option<String> {
        vars().get(name).map(ToString::to_string)
    }

    #[test]
    fn test_expand_known_variables() {
        let out = expand(
            "--index-url https://${TOKEN}@${INDEX_HOST}/simple",
            lookup,
            OnMissing::Error,
        )
        .unwrap();
        assert_eq!(out, "--index-url https://s3cret@pypi.internal/simple");
    }

    #[test]
    fn test_keep_literal() {
        let out = expand("-r ${MISSING}/base.txt", lookup, OnMissing::KeepLiteral).unwrap();
        assert_eq!(out, "-r ${MISSING}/base.txt");
    }

    #[test]
    fn test_error_on_missing() {
        let err = expand("${TOKEN} ${MISSING}", lookup, OnMissing::Error).unwrap_err();
        assert_eq!(
            err,
            ExpandError::MissingVariable {
                name: "MISSING".to_string()
            }
        );
    }

    #[test]
    fn test_only_uppercase_names_expand() {
        let out = expand("$TOKEN ${token} ${1A}", lookup, OnMissing::Error).unwrap();
        assert_eq!(out, "$TOKEN ${token} ${1A}");
    }

    #[test]
    fn test_on_missing_config_names() {
        let parsed: OnMissing = serde_json::from_str("\"keep-literal\"").unwrap();
        assert_eq!(parsed, OnMissing::KeepLiteral);
        let parsed: OnMissing = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, OnMissing::Error);
    }
}
