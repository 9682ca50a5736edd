//! Error types for refconf
//!
//! Errors are structured: a kind, the configuration key where the problem
//! was detected, an optional cause line and an actionable help message.

use std::fmt;

/// Result type alias for refconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for refconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Configuration key where the error occurred (e.g., "server.hostname")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON input
    Parse,
    /// Error during placeholder resolution
    Resolver(ResolverErrorKind),
    /// I/O error (file not found, etc.)
    Io,
}

/// Specific resolver error categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverErrorKind {
    /// A `$secret{alias}` has no entry in the secret store
    UnresolvedSecret { alias: String },
    /// A secret is stored as a plain-text `[...]` literal while encryption is required
    PlainTextSecret { alias: String },
    /// One or more `$ref{key}` placeholders never became resolvable
    UnresolvedReference { keys: Vec<String> },
    /// A `$sys{}` or `$env{}` name has no value in its source
    PropertyNotFound { source: String, name: String },
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an unresolved secret error
    pub fn unresolved_secret(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            kind: ErrorKind::Resolver(ResolverErrorKind::UnresolvedSecret {
                alias: alias.clone(),
            }),
            path: None,
            help: Some(format!("Add an entry for '{}' to the secret store", alias)),
            cause: None,
        }
    }

    /// Create a plain-text secret policy error
    pub fn plain_text_secret(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            kind: ErrorKind::Resolver(ResolverErrorKind::PlainTextSecret {
                alias: alias.clone(),
            }),
            path: None,
            help: Some(format!(
                "Encrypt the value of '{}' or disable the encrypted-secrets requirement",
                alias
            )),
            cause: None,
        }
    }

    /// Create an unresolved reference error
    ///
    /// `pending` lists, per blocked key, the placeholders it still waits on.
    pub fn unresolved_reference(keys: Vec<String>, pending: Vec<String>) -> Self {
        Self {
            kind: ErrorKind::Resolver(ResolverErrorKind::UnresolvedReference { keys }),
            path: None,
            help: Some(
                "Check that every referenced key exists and that no references form a cycle"
                    .into(),
            ),
            cause: if pending.is_empty() {
                None
            } else {
                Some(format!("Pending: {}", pending.join(", ")))
            },
        }
    }

    /// Create a property not found error for a `$sys{}` or `$env{}` lookup
    pub fn property_not_found(source: impl Into<String>, name: impl Into<String>) -> Self {
        let source = source.into();
        let name = name.into();
        let help = match source.as_str() {
            "env" => format!("Set the {} environment variable", name),
            "sys" => format!("Define the system property with -D {}=<value>", name),
            _ => format!("Provide a value for '{}' in the {} source", name, source),
        };
        Self {
            kind: ErrorKind::Resolver(ResolverErrorKind::PropertyNotFound { source, name }),
            path: None,
            help: Some(help),
            cause: None,
        }
    }

    /// Attach the configuration key the error was detected at
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Main error message
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Resolver(r) => match r {
                ResolverErrorKind::UnresolvedSecret { alias } => {
                    write!(f, "Secret reference can't be resolved: {}", alias)?
                }
                ResolverErrorKind::PlainTextSecret { alias } => {
                    write!(f, "Secret reference can't be plain text: {}", alias)?
                }
                ResolverErrorKind::UnresolvedReference { keys } => {
                    write!(f, "References can't be resolved for {}", keys.join(", "))?
                }
                ResolverErrorKind::PropertyNotFound { source, name } => {
                    write!(f, "Placeholder ${}{{{}}} has no value", source, name)?
                }
            },
            ErrorKind::Io => write!(f, "I/O error")?,
        }

        // Path context
        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        // Cause
        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        // Help
        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
