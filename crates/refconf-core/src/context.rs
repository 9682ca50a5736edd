//! Flat configuration context
//!
//! A context maps dotted keys (`server.hostname`) to values. Nested
//! documents are flattened on load; sequences stay whole values.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Flat mapping of configuration keys to values, iterated in insertion order
pub type Context = IndexMap<String, Value>;

/// Flatten a nested mapping into a context with dotted keys
///
/// Scalars and sequences are leaves. An empty mapping is kept as a leaf so
/// that the key does not disappear. A null root gives an empty context.
pub fn flatten(value: Value) -> Result<Context> {
    let mut context = Context::new();
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                flatten_into(&key, child, &mut context);
            }
            Ok(context)
        }
        Value::Null => Ok(context),
        other => Err(Error::parse(format!(
            "Configuration root must be a mapping, got {}",
            other.type_name()
        ))),
    }
}

fn flatten_into(prefix: &str, value: Value, context: &mut Context) {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(&format!("{}.{}", prefix, key), child, context);
            }
        }
        leaf => {
            context.insert(prefix.to_string(), leaf);
        }
    }
}

/// Load a context from a YAML document
pub fn from_yaml(yaml: &str) -> Result<Context> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;
    flatten(value)
}

/// Load a context from a JSON document
pub fn from_json(json: &str) -> Result<Context> {
    let value: Value = serde_json::from_str(json).map_err(|e| Error::parse(e.to_string()))?;
    flatten(value)
}

/// Iterate over every string a secret scan covers: top-level strings, string
/// elements of sequences, and string values of mappings directly inside a
/// sequence. Yields `(key, string)`.
pub(crate) fn secret_scan_strings(context: &Context) -> impl Iterator<Item = (&str, &str)> {
    context.iter().flat_map(|(key, value)| {
        let strings: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Sequence(items) => items
                .iter()
                .flat_map(|item| match item {
                    Value::String(s) => vec![s.as_str()],
                    Value::Mapping(map) => map.values().filter_map(Value::as_str).collect(),
                    _ => Vec::new(),
                })
                .collect(),
            _ => Vec::new(),
        };
        strings.into_iter().map(move |s| (key.as_str(), s))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_nested_yaml() {
        let context = from_yaml(
            r#"
server:
  hostname: localhost
  offset: 0
transport:
  https:
    port: 9443
"#,
        )
        .unwrap();

        let keys: Vec<&str> = context.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["server.hostname", "server.offset", "transport.https.port"]
        );
        assert_eq!(context["transport.https.port"], Value::Integer(9443));
    }

    #[test]
    fn test_flatten_keeps_sequences_whole() {
        let context = from_yaml(
            r#"
user_store:
  hosts: [a, b]
"#,
        )
        .unwrap();

        assert_eq!(context["user_store.hosts"], Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_flatten_keeps_empty_mapping() {
        let context = from_json(r#"{"a": {}, "b": "x"}"#).unwrap();
        assert!(matches!(context["a"], Value::Mapping(_)));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_flatten_null_root() {
        let context = from_yaml("").unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_flatten_rejects_scalar_root() {
        let err = from_json("42").unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(from_yaml("key: [unclosed").is_err());
    }

    #[test]
    fn test_secret_scan_strings_walks_one_level_into_sequences() {
        let context = from_yaml(
            r#"
plain: "$secret{a}"
list:
  - "$secret{b}"
  - 7
  - name: "$secret{c}"
    nested:
      deeper: "$secret{d}"
"#,
        )
        .unwrap();

        let scanned: Vec<(&str, &str)> = secret_scan_strings(&context).collect();
        assert_eq!(
            scanned,
            vec![
                ("plain", "$secret{a}"),
                ("list", "$secret{b}"),
                ("list", "$secret{c}"),
            ]
        );
    }
}
