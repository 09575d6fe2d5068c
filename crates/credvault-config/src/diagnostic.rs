// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(credvault::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(credvault::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(credvault::config::missing_key),
        help("set `{key}` in credvault.toml or via {env_hint}")
    )]
    MissingKey { key: String, env_hint: String },

    /// A semantic validation failure.
    #[error("validation error: {message}")]
    #[diagnostic(code(credvault::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(credvault::config::other))]
    Other(String),
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let known = format!("known keys in this section: {valid_keys}");
    suggestion.map_or(known.clone(), |s| format!("did you mean `{s}`? {known}"))
}

/// Translate every error carried by a `figment::Error` into a diagnostic.
///
/// `toml_sources` holds `(path, contents)` pairs used to attach a labelled
/// span to unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    let dotted = || error.path.join(".");
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let located = locate(error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span: located.as_ref().map(|(span, _)| *span),
                src: located.map(|(_, src)| src),
            }
        }
        Kind::MissingField(field) => {
            let key = match dotted() {
                prefix if prefix.is_empty() => field.to_string(),
                prefix => format!("{prefix}.{field}"),
            };
            ConfigError::MissingKey {
                env_hint: format!("CREDVAULT_{}", key.replace('.', "__").to_uppercase()),
                key,
            }
        }
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted(),
            detail: format!("got {actual}"),
            expected: expected.clone(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Find the TOML file an error came from and the span of `field` inside it.
fn locate(
    error: &figment::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|meta| meta.source.as_ref())
        .and_then(|source| source.file_path())
        .map(|path| path.display().to_string());

    // Inline TOML carries no file path; a lone source must be it.
    let (name, content) = match file {
        Some(file) => toml_sources.iter().find(|(name, _)| *name == file)?,
        None => match toml_sources {
            [only] => only,
            _ => return None,
        },
    };

    let offset = find_key_offset(content, &error.path, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(name, content.clone()),
    ))
}

/// Byte offset of `field` within the table named by `path[0]`, or within
/// the root table when `path` is empty.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = path.first().map(String::as_str);
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = Some(header.trim());
        } else if current == wanted {
            let indent = line.len() - line.trim_start().len();
            let rest = &line[indent..];
            let is_key = rest
                .strip_prefix(field)
                .is_some_and(|after| after.trim_start().starts_with('='));
            if is_key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if any is
/// close enough to be worth suggesting.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, candidates: &[S]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for candidate in candidates.iter().map(AsRef::as_ref) {
        let score = strsim::jaro_winkler(unknown, candidate);
        if score > SUGGESTION_THRESHOLD && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, key)| key.to_string())
}

/// Print each error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("config error: {error}"),
        }
    }
}
