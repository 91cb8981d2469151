//! Global option lines (`--index-url ...`) and include directives (`-r file`).

use super::lexer::LogicalLine;
use reqtxt_core::{
    Diagnostic, DiagnosticKind, IncludeKind, IncludePayload, OptionLine, Spanned,
};

/// A pip option that may appear on a line of its own
#[derive(Debug, PartialEq, Eq)]
pub struct OptionSpec {
    pub short: Option<&'static str>,
    pub long: &'static str,
    pub takes_value: bool,
}

impl OptionSpec {
    /// Long name without the leading dashes
    pub fn name(&self) -> &'static str {
        self.long.trim_start_matches('-')
    }
}

pub const GLOBAL_OPTIONS: &[OptionSpec] = &[
    OptionSpec { short: Some("-i"), long: "--index-url", takes_value: true },
    OptionSpec { short: None, long: "--extra-index-url", takes_value: true },
    OptionSpec { short: None, long: "--no-index", takes_value: false },
    OptionSpec { short: Some("-f"), long: "--find-links", takes_value: true },
    OptionSpec { short: None, long: "--no-binary", takes_value: true },
    OptionSpec { short: None, long: "--only-binary", takes_value: true },
    OptionSpec { short: None, long: "--prefer-binary", takes_value: false },
    OptionSpec { short: None, long: "--require-hashes", takes_value: false },
    OptionSpec { short: None, long: "--pre", takes_value: false },
    OptionSpec { short: None, long: "--trusted-host", takes_value: true },
    OptionSpec { short: None, long: "--use-feature", takes_value: true },
];

/// Option line used for `-e` entries whose package name cannot be told
pub const EDITABLE: OptionSpec = OptionSpec {
    short: Some("-e"),
    long: "--editable",
    takes_value: true,
};

/// Short flags that accept their value glued on, as in `-rbase.txt`
const ATTACHABLE: [&str; 5] = ["-r", "-c", "-e", "-i", "-f"];

pub fn lookup(flag: &str) -> Option<&'static OptionSpec> {
    GLOBAL_OPTIONS
        .iter()
        .find(|spec| spec.long == flag || spec.short == Some(flag))
}

/// Location of a leading flag inside a line's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub start: usize,
    pub end: usize,
    /// Where the value begins, after `=` or blanks
    pub value_start: usize,
}

impl Flag {
    pub fn name<'c>(&self, content: &'c str) -> &'c str {
        &content[self.start..self.end]
    }
}

/// Read the flag starting at content index `start`
pub fn read_flag(content: &str, start: usize) -> Flag {
    let rest = &content[start..];
    let len = rest
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(rest.len());
    let token = &rest[..len];

    if !token.starts_with("--") && token.len() > 2 && ATTACHABLE.contains(&&token[..2]) {
        return Flag {
            start,
            end: start + 2,
            value_start: start + 2,
        };
    }

    let end = start + len;
    let after = &content[end..];
    let value_start = match after.strip_prefix('=') {
        Some(value) => end + 1 + (value.len() - value.trim_start().len()),
        None => end + (after.len() - after.trim_start().len()),
    };

    Flag {
        start,
        end,
        value_start,
    }
}

/// The flag of a line plus its trimmed value, if it has one
pub fn flag_and_value(line: &LogicalLine<'_>) -> (Spanned<String>, Option<Spanned<String>>) {
    let content = &line.content;
    let lead = content.len() - content.trim_start().len();
    let flag = read_flag(content, lead);
    let body_end = line.body_end().max(flag.end);

    let flag_spanned = Spanned::new(
        flag.name(content).to_string(),
        line.span_of(flag.start..flag.end),
    );

    let value_start = flag.value_start.min(body_end);
    let value_end = value_start + content[value_start..body_end].trim_end().len();
    let value = (value_end > value_start).then(|| {
        Spanned::new(
            content[value_start..value_end].to_string(),
            line.span_of(value_start..value_end),
        )
    });

    (flag_spanned, value)
}

pub fn parse_option(line: &LogicalLine<'_>, spec: &OptionSpec) -> Result<OptionLine, Diagnostic> {
    let (flag, value) = flag_and_value(line);

    if spec.takes_value && value.is_none() {
        return Err(Diagnostic::new(
            DiagnosticKind::MissingOptionValue,
            flag.span,
            format!("option {} needs a value", flag.value),
        ));
    }

    Ok(OptionLine {
        flag,
        name: spec.name().to_string(),
        value,
        comment: line.comment(),
    })
}

pub fn parse_include(
    line: &LogicalLine<'_>,
    directive: IncludeKind,
) -> Result<IncludePayload, Diagnostic> {
    let (flag, target) = flag_and_value(line);

    let Some(target) = target else {
        return Err(Diagnostic::new(
            DiagnosticKind::MissingOptionValue,
            flag.span,
            format!("{directive} include {} needs a file path", flag.value),
        ));
    };

    Ok(IncludePayload {
        directive,
        flag,
        target,
        comment: line.comment(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::lexer::split_lines;

    #[test]
    fn test_read_flag_forms() {
        let flag = read_flag("--index-url=https://x", 0);
        assert_eq!(flag.name("--index-url=https://x"), "--index-url");
        assert_eq!(flag.value_start, 12);

        let flag = read_flag("  -r   base.txt", 2);
        assert_eq!((flag.start, flag.end, flag.value_start), (2, 4, 7));

        let flag = read_flag("-cconstraints.txt", 0);
        assert_eq!((flag.end, flag.value_start), (2, 2));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("-i").map(OptionSpec::name), Some("index-url"));
        assert_eq!(lookup("--pre").map(|spec| spec.takes_value), Some(false));
        assert!(lookup("--bogus").is_none());
    }

    #[test]
    fn test_parse_option_line() {
        let text = "--extra-index-url https://pypi.example.com/simple  # mirror\n";
        let lines = split_lines(text);
        let option = parse_option(&lines[0], lookup("--extra-index-url").unwrap()).unwrap();

        assert_eq!(option.name, "extra-index-url");
        let value = option.value.unwrap();
        assert_eq!(value.value, "https://pypi.example.com/simple");
        assert_eq!(&text[value.span.range()], value.value);
        assert_eq!(option.comment.unwrap().text.value, "mirror");
    }

    #[test]
    fn test_option_missing_value() {
        let lines = split_lines("--index-url\n");
        let err = parse_option(&lines[0], lookup("--index-url").unwrap()).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MissingOptionValue);
    }

    #[test]
    fn test_flag_option_without_value() {
        let lines = split_lines("--no-index\n");
        let option = parse_option(&lines[0], lookup("--no-index").unwrap()).unwrap();
        assert!(option.value.is_none());
        assert_eq!(option.flag.value, "--no-index");
    }

    #[test]
    fn test_parse_include() {
        let text = "-r requirements/base.txt # shared\n";
        let lines = split_lines(text);
        let include = parse_include(&lines[0], IncludeKind::Reference).unwrap();
        assert_eq!(include.flag.value, "-r");
        assert_eq!(include.target.value, "requirements/base.txt");
        assert_eq!(&text[include.target.span.range()], "requirements/base.txt");
        assert!(include.comment.is_some());

        let lines = split_lines("--constraint=constraints.txt\n");
        let include = parse_include(&lines[0], IncludeKind::Constraint).unwrap();
        assert_eq!(include.target.value, "constraints.txt");
    }

    #[test]
    fn test_include_without_target() {
        let lines = split_lines("-r   # nothing\n");
        let err = parse_include(&lines[0], IncludeKind::Reference).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MissingOptionValue);
    }
}
