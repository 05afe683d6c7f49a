// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics: turns Figment failures into miette reports that
//! point at the offending line of `cabline.toml`.
//!
//! A misspelt key is matched against the keys of its own section, and a
//! misspelt section header against the section names, so `[bookng]` or
//! `tax_rte` both come back with a correction.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::SECTIONS;

/// Jaro-Winkler score a candidate must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key the section does not define, or a section that does not exist
    /// (`section` is empty then).
    #[error("unknown configuration key `{}`", dotted(section, key))]
    #[diagnostic(
        code(cabline::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted in `section`.
        valid_keys: String,
        #[label("not a {} setting", scope(section))]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(cabline::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(cabline::config::missing_key),
        help("add `{key} = <value>` to cabline.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but makes no sense for the service.
    #[error("validation error: {message}")]
    #[diagnostic(code(cabline::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(cabline::config::other))]
    Other(String),
}

fn dotted(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{section}.{key}")
    }
}

fn scope(section: &str) -> &str {
    if section.is_empty() { "top-level" } else { section }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// One TOML file the config was merged from, kept for span lookups.
struct Source<'a> {
    path: &'a str,
    content: &'a str,
}

impl<'a> Source<'a> {
    /// The file a Figment error was read from. Inline strings carry no file
    /// origin, so a lone source is assumed to be the one.
    fn of(error: &figment::Error, sources: &'a [(String, String)]) -> Option<Self> {
        let origin = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| s.file_path())
            .map(|p| p.display().to_string());
        let found = match origin {
            Some(origin) => sources.iter().find(|(path, _)| *path == origin),
            None => None,
        };
        found
            .or_else(|| sources.first().filter(|_| sources.len() == 1))
            .map(|(path, content)| Source { path, content })
    }

    fn locate(
        &self,
        section: &str,
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        match key_offset(self.content, section, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(self.path, self.content.to_string())),
            ),
            None => (None, None),
        }
    }
}

/// Converts every error Figment collected into a diagnostic.
///
/// `sources` pairs each TOML path with its content; they are only used to
/// attach spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let section = error.path.first().cloned().unwrap_or_default();
            let source = Source::of(&error, sources);
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let candidates: &[&str] = if section.is_empty() {
                        &SECTIONS
                    } else {
                        expected
                    };
                    let (span, src) = source
                        .map(|s| s.locate(&section, field))
                        .unwrap_or((None, None));
                    ConfigError::UnknownKey {
                        suggestion: suggest_key(field, candidates),
                        valid_keys: candidates.join(", "),
                        section,
                        key: field.clone(),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&section, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let key = error.path.last().cloned().unwrap_or_default();
                    let (span, src) = source
                        .filter(|_| error.path.len() == 2)
                        .map(|s| s.locate(&section, &key))
                        .unwrap_or((None, None));
                    ConfigError::InvalidType {
                        key: error.path.join("."),
                        detail: format!("found {actual}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Byte offset of `key` inside `[section]`, or among the top-level lines
/// before any header when `section` is empty.
pub fn key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if section.is_empty() && current == key {
                return Some(offset + indent + 1);
            }
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The closest candidate above the similarity threshold.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (*candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string())
}

/// Prints each error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_and_validate_str;

    #[test]
    fn suggests_within_section_keys() {
        let keys = &["sweep_interval_secs", "lookahead_minutes"];
        assert_eq!(
            suggest_key("lookahed_minutes", keys),
            Some("lookahead_minutes".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", keys), None);
    }

    #[test]
    fn misspelt_section_suggests_section_name() {
        let errors = load_and_validate_str("[bookng]\ntax_rate_percent = 5.0\n")
            .expect_err("unknown section must fail");
        let found = errors.iter().any(|e| {
            matches!(
                e,
                ConfigError::UnknownKey { section, key, suggestion: Some(s), .. }
                    if section.is_empty() && key == "bookng" && s == "booking"
            )
        });
        assert!(found, "got {errors:?}");
    }

    #[test]
    fn unknown_key_carries_span_into_inline_source() {
        let toml = "[service]\nname = \"x\"\n\n[booking]\ntax_rte = 5.0\n";
        let errors = load_and_validate_str(toml).expect_err("unknown key must fail");
        let Some(ConfigError::UnknownKey {
            section,
            span: Some(span),
            ..
        }) = errors.first()
        else {
            panic!("expected a located unknown key, got {errors:?}");
        };
        assert_eq!(section, "booking");
        assert_eq!(&toml[span.offset()..span.offset() + span.len()], "tax_rte");
    }

    #[test]
    fn key_offset_respects_section_boundaries() {
        let content = "[service]\nname = \"x\"\n[gateway]\n  port = 1\n[booking]\nname = \"y\"\n";
        let o = key_offset(content, "gateway", "port").expect("port is in gateway");
        assert_eq!(&content[o..o + 4], "port");
        let o = key_offset(content, "booking", "name").expect("name is in booking");
        assert!(o > content.find("[booking]").unwrap());
        assert_eq!(key_offset(content, "maps", "name"), None);
        assert_eq!(
            key_offset(content, "", "gateway"),
            Some(content.find("gateway").unwrap())
        );
    }

    #[test]
    fn key_prefix_is_not_a_match() {
        let content = "[booking]\notp_ttl_secs_extra = 1\notp_ttl_secs = 2\n";
        let o = key_offset(content, "booking", "otp_ttl_secs").unwrap();
        assert!(content[o..].starts_with("otp_ttl_secs = 2"));
    }

    #[test]
    fn missing_key_is_dotted() {
        assert_eq!(dotted("gateway", "port"), "gateway.port");
        assert_eq!(dotted("", "gateway"), "gateway");
    }
}
