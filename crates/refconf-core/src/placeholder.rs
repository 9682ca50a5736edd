//! Placeholder scanning
//!
//! Recognizes four placeholder forms inside string values:
//! - `$ref{key}` - another key of the same context
//! - `$sys{name}` - a system property
//! - `$env{name}` - an environment variable
//! - `$secret{alias}` - an entry of the secret store
//!
//! Matching is "first opening token, next closing brace": placeholders do
//! not nest and a scan never looks inside a match it already consumed.

use std::fmt;

use crate::error::Result;

/// Closing delimiter shared by every placeholder form
pub const PLACEHOLDER_SUFFIX: &str = "}";

/// The four placeholder categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// `$ref{key}`
    Ref,
    /// `$sys{name}`
    Sys,
    /// `$env{name}`
    Env,
    /// `$secret{alias}`
    Secret,
}

impl PlaceholderKind {
    /// Opening token for this kind (e.g. `$ref{`)
    pub fn prefix(self) -> &'static str {
        match self {
            PlaceholderKind::Ref => "$ref{",
            PlaceholderKind::Sys => "$sys{",
            PlaceholderKind::Env => "$env{",
            PlaceholderKind::Secret => "$secret{",
        }
    }

    /// Short name used in logs and errors (e.g. `ref`)
    pub fn name(self) -> &'static str {
        match self {
            PlaceholderKind::Ref => "ref",
            PlaceholderKind::Sys => "sys",
            PlaceholderKind::Env => "env",
            PlaceholderKind::Secret => "secret",
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Iterator over the names of one placeholder kind in a string
pub struct PlaceholderScanner<'a> {
    input: &'a str,
    pos: usize,
    prefix: &'static str,
}

impl<'a> PlaceholderScanner<'a> {
    /// Create a new scanner for the given input
    pub fn new(input: &'a str, kind: PlaceholderKind) -> Self {
        Self {
            input,
            pos: 0,
            prefix: kind.prefix(),
        }
    }
}

impl<'a> Iterator for PlaceholderScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = &self.input[self.pos..];
        let open = rest.find(self.prefix)?;
        let name_start = self.pos + open + self.prefix.len();

        // An opening token with no closing brace ends the scan
        let close = self.input[name_start..].find(PLACEHOLDER_SUFFIX)?;
        let name_end = name_start + close;

        self.pos = name_end + PLACEHOLDER_SUFFIX.len();
        Some(&self.input[name_start..name_end])
    }
}

/// Scan `input` for placeholders of `kind`, yielding their inner names in order
pub fn scan(input: &str, kind: PlaceholderKind) -> PlaceholderScanner<'_> {
    PlaceholderScanner::new(input, kind)
}

/// Check if a string contains at least one placeholder of `kind`
pub fn contains(input: &str, kind: PlaceholderKind) -> bool {
    scan(input, kind).next().is_some()
}

/// Render the exact placeholder token for a name (e.g. `$ref{server.port}`)
pub fn token(kind: PlaceholderKind, name: &str) -> String {
    format!("{}{}{}", kind.prefix(), name, PLACEHOLDER_SUFFIX)
}

/// Replace every placeholder of `kind` in `input` using `lookup`
///
/// Each distinct name is looked up once and every occurrence of its exact
/// token is replaced. Returns `None` when the input had nothing to replace.
pub fn substitute<F>(input: &str, kind: PlaceholderKind, mut lookup: F) -> Result<Option<String>>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut names: Vec<&str> = Vec::new();
    for name in scan(input, kind) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Ok(None);
    }

    let mut output = input.to_string();
    for name in names {
        let replacement = lookup(name)?;
        output = output.replace(&token(kind, name), &replacement);
    }

    Ok(Some(output))
}
