use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version specifier: {0}")]
    InvalidSpecifier(String),
    #[error("Unknown version operator in: {0}")]
    UnknownOperator(String),
    #[error("Empty version specifier")]
    Empty,
}

/// A PEP 440 comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// ===
    ArbitraryEqual,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// ~=
    Compatible,
    /// >=
    GreaterEqual,
    /// <=
    LessEqual,
    /// >
    Greater,
    /// <
    Less,
}

impl Operator {
    /// Longest operators first so `===` is never read as `==`
    pub const ALL: [Operator; 8] = [
        Operator::ArbitraryEqual,
        Operator::Equal,
        Operator::NotEqual,
        Operator::Compatible,
        Operator::GreaterEqual,
        Operator::LessEqual,
        Operator::Greater,
        Operator::Less,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Compatible => "~=",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
        }
    }

    /// Split a leading operator off `s`
    pub fn strip(s: &str) -> Option<(Operator, &str)> {
        Self::ALL
            .iter()
            .find_map(|op| s.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }

    /// Characters that can start an operator
    pub fn is_operator_char(c: char) -> bool {
        matches!(c, '=' | '!' | '~' | '<' | '>')
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<op><version>` clause, e.g. `>=1.2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specifier {
    pub operator: Operator,
    pub version: String,
}

impl Specifier {
    pub fn new(operator: Operator, version: impl Into<String>) -> Self {
        Self {
            operator,
            version: version.into(),
        }
    }

    fn is_version_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '_' | '-')
    }
}

impl FromStr for Specifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        let (operator, rest) =
            Operator::strip(s).ok_or_else(|| VersionError::UnknownOperator(s.to_string()))?;
        let version = rest.trim_start();

        if version.is_empty() {
            return Err(VersionError::InvalidSpecifier(s.to_string()));
        }

        // `===` compares arbitrary strings, minus what the line grammar claims;
        // everything else must look like a version
        let valid = match operator {
            Operator::ArbitraryEqual => !version.chars().any(|c| {
                c.is_whitespace() || matches!(c, ',' | ';' | '#' | '\\' | '"' | '\'' | '[')
            }),
            _ => {
                version.chars().all(Specifier::is_version_char)
                    && version.starts_with(|c: char| c.is_ascii_alphanumeric())
            }
        };

        if !valid {
            return Err(VersionError::InvalidSpecifier(s.to_string()));
        }

        Ok(Specifier::new(operator, version))
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// Parse a comma separated specifier list such as `>=1.0,<2.0`
///
/// Order is preserved exactly as written.
pub fn parse_specifiers(s: &str) -> Result<Vec<Specifier>, VersionError> {
    if s.trim().is_empty() {
        return Err(VersionError::Empty);
    }
    s.split(',').map(Specifier::from_str).collect()
}

/// Normalize a package or extra name for comparison (PEP 503)
///
/// Lowercases and collapses runs of `-`, `_` and `.` into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
                in_separator = true;
            }
        } else {
            normalized.extend(c.to_lowercase());
            in_separator = false;
        }
    }

    normalized
}

/// Check whether two names refer to the same package
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specifier() {
        let spec: Specifier = ">=1.2.3".parse().unwrap();
        assert_eq!(spec.operator, Operator::GreaterEqual);
        assert_eq!(spec.version, "1.2.3");

        let spec: Specifier = "== 2.0".parse().unwrap();
        assert_eq!(spec.operator, Operator::Equal);
        assert_eq!(spec.version, "2.0");
        assert_eq!(spec.to_string(), "==2.0");
    }

    #[test]
    fn test_operator_precedence() {
        let spec: Specifier = "===foobar".parse().unwrap();
        assert_eq!(spec.operator, Operator::ArbitraryEqual);

        let spec: Specifier = "~=1.4".parse().unwrap();
        assert_eq!(spec.operator, Operator::Compatible);

        let spec: Specifier = "<1".parse().unwrap();
        assert_eq!(spec.operator, Operator::Less);
    }

    #[test]
    fn test_arbitrary_equal_rejects_line_syntax() {
        for text in ["===1.0;os_name=='nt'", "===1.0#evil", "===1\\", "===a\"b", "===x[y]"] {
            assert!(text.parse::<Specifier>().is_err(), "{text}");
        }
        assert_eq!("===1.0-local".parse::<Specifier>().unwrap().version, "1.0-local");
    }

    #[test]
    fn test_parse_wildcard_and_prerelease() {
        assert!("==1.2.*".parse::<Specifier>().is_ok());
        assert!("!=3.0.0rc1".parse::<Specifier>().is_ok());
        assert!(">=1.0.post1+local.7".parse::<Specifier>().is_ok());
    }

    #[test]
    fn test_parse_invalid_specifier() {
        assert!(matches!(
            "=1.0".parse::<Specifier>(),
            Err(VersionError::UnknownOperator(_))
        ));
        assert!(matches!(
            "1.0".parse::<Specifier>(),
            Err(VersionError::UnknownOperator(_))
        ));
        assert!(matches!(
            ">=".parse::<Specifier>(),
            Err(VersionError::InvalidSpecifier(_))
        ));
        assert!(matches!(
            ">=1.0 # nope".parse::<Specifier>(),
            Err(VersionError::InvalidSpecifier(_))
        ));
        assert!(matches!("".parse::<Specifier>(), Err(VersionError::Empty)));
    }

    #[test]
    fn test_parse_specifiers_keeps_order() {
        let specs = parse_specifiers(">=1.0, <2.0,!=1.5").unwrap();
        let rendered: Vec<String> = specs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec![">=1.0", "<2.0", "!=1.5"]);
        assert!(parse_specifiers(">=1.0,,<2").is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Django"), "django");
        assert_eq!(normalize_name("typing_extensions"), "typing-extensions");
        assert_eq!(normalize_name("zope.Interface"), "zope-interface");
        assert_eq!(normalize_name("a__-.b"), "a-b");
        assert!(names_match("Flask-SQLAlchemy", "flask_sqlalchemy"));
    }
}
