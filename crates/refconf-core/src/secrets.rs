//! Secret placeholder validation
//!
//! `$secret{alias}` placeholders are checked against a [`SecretStore`] but
//! never rewritten: the literal secret is looked up later by a vault-aware
//! consumer, so the placeholder text is still present after resolution.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::context::{self, Context};
use crate::error::{Error, Result};
use crate::placeholder::{self, PlaceholderKind};

const PLAIN_TEXT_PREFIX: char = '[';
const PLAIN_TEXT_SUFFIX: char = ']';

/// Trait for secret stores consulted during validation
///
/// The store is filled by the caller (including any decryption of its own
/// contents) before resolution starts.
pub trait SecretStore {
    /// Retrieve a secret by alias
    fn lookup(&self, alias: &str) -> Option<String>;
}

impl SecretStore for HashMap<String, String> {
    fn lookup(&self, alias: &str) -> Option<String> {
        self.get(alias).cloned()
    }
}

impl SecretStore for IndexMap<String, String> {
    fn lookup(&self, alias: &str) -> Option<String> {
        self.get(alias).cloned()
    }
}

impl SecretStore for BTreeMap<String, String> {
    fn lookup(&self, alias: &str) -> Option<String> {
        self.get(alias).cloned()
    }
}

impl<S: SecretStore + ?Sized> SecretStore for &S {
    fn lookup(&self, alias: &str) -> Option<String> {
        (**self).lookup(alias)
    }
}

/// Policy applied to looked-up secret values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPolicy {
    /// Reject secrets still stored as plain-text `[...]` literals
    pub require_encrypted: bool,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            require_encrypted: true,
        }
    }
}

/// Check whether a stored secret is a plain-text `[...]` literal
pub fn is_plain_text(secret: &str) -> bool {
    let trimmed = secret.trim();
    trimmed.len() >= 2
        && trimmed.starts_with(PLAIN_TEXT_PREFIX)
        && trimmed.ends_with(PLAIN_TEXT_SUFFIX)
}

/// Validate every `$secret{alias}` placeholder in the context
///
/// Covers top-level strings, string elements of sequences, and string values
/// of mappings directly inside a sequence. Returns `true` when at least one
/// secret placeholder was found (and all of them were valid).
pub fn validate_secrets(
    context: &Context,
    secrets: &dyn SecretStore,
    policy: &SecretPolicy,
) -> Result<bool> {
    let mut found = false;

    for (key, value) in context::secret_scan_strings(context) {
        for alias in placeholder::scan(value, PlaceholderKind::Secret) {
            let secret = secrets
                .lookup(alias)
                .ok_or_else(|| Error::unresolved_secret(alias).with_path(key))?;

            if policy.require_encrypted && is_plain_text(&secret) {
                return Err(Error::plain_text_secret(alias).with_path(key));
            }

            log::trace!("Secret placeholder '{}' in '{}' is valid", alias, key);
            found = true;
        }
    }

    log::debug!("Secret vault enabled: {}", found);
    Ok(found)
}
