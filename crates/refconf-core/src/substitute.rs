//! `$sys{}` / `$env{}` substitution
//!
//! Rewrites top-level strings and string elements of sequences. Mappings
//! nested inside sequences are left alone, unlike the secret scan.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::placeholder::{self, PlaceholderKind};
use crate::source::PropertySource;
use crate::value::Value;

/// Replace every placeholder of `kind` in the context with values from `source`
///
/// A name the source cannot answer fails the whole substitution.
pub fn substitute(
    context: Context,
    kind: PlaceholderKind,
    source: &dyn PropertySource,
) -> Result<Context> {
    let mut replaced = 0usize;
    let mut output = Context::with_capacity(context.len());

    for (key, value) in context {
        let value = match value {
            Value::String(s) => Value::String(substitute_str(&key, s, kind, source, &mut replaced)?),
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => {
                            substitute_str(&key, s, kind, source, &mut replaced).map(Value::String)
                        }
                        other => Ok(other),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => other,
        };
        output.insert(key, value);
    }

    log::debug!("Substituted ${} placeholders in {} value(s)", kind, replaced);
    Ok(output)
}

fn substitute_str(
    key: &str,
    input: String,
    kind: PlaceholderKind,
    source: &dyn PropertySource,
    replaced: &mut usize,
) -> Result<String> {
    let resolved = placeholder::substitute(&input, kind, |name| {
        source
            .get(name)
            .ok_or_else(|| Error::property_not_found(kind.name(), name).with_path(key))
    })?;

    match resolved {
        Some(s) => {
            log::trace!("Resolved ${} placeholders in '{}'", kind, key);
            *replaced += 1;
            Ok(s)
        }
        None => Ok(input),
    }
}
