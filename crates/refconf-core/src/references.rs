//! `$ref{}` resolution
//!
//! References between keys form a directed graph. Resolution is an
//! iterative fixpoint: each sweep substitutes every reference whose target
//! is already literal, then drops it from the graph. Whatever is left when a
//! sweep makes no progress is either a cycle or a reference to a key that
//! does not exist.

use indexmap::{IndexMap, IndexSet};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::placeholder::{self, PlaceholderKind};
use crate::value::Value;

/// Dependency graph between context keys
///
/// Holds a forward view (`needs`: key -> references it still waits on) and a
/// reverse view (`dependents`: reference -> keys waiting on it). Both views
/// are only changed together, so `key ∈ dependents[r]` exactly when
/// `r ∈ needs[key]`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    needs: IndexMap<String, IndexSet<String>>,
    dependents: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every string value of the context, in context order
    pub fn from_context(context: &Context) -> Self {
        let mut graph = Self::new();
        for (key, value) in context {
            if let Value::String(s) = value {
                for reference in placeholder::scan(s, PlaceholderKind::Ref) {
                    graph.add_dependency(key, reference);
                }
            }
        }
        graph
    }

    /// Record that `key` references `reference`
    pub fn add_dependency(&mut self, key: &str, reference: &str) {
        self.needs
            .entry(key.to_string())
            .or_default()
            .insert(reference.to_string());
        self.dependents
            .entry(reference.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Remove every edge pointing at `reference`, returning the keys that waited on it
    ///
    /// Keys left with no outstanding references are dropped from the forward view.
    pub fn remove_reference(&mut self, reference: &str) -> IndexSet<String> {
        let dependents = self.dependents.shift_remove(reference).unwrap_or_default();
        for key in &dependents {
            if let Some(needs) = self.needs.get_mut(key) {
                needs.shift_remove(reference);
                if needs.is_empty() {
                    self.needs.shift_remove(key);
                }
            }
        }
        dependents
    }

    /// References still outstanding for `key`
    pub fn needs(&self, key: &str) -> Option<&IndexSet<String>> {
        self.needs.get(key)
    }

    /// Keys still waiting on `reference`
    pub fn dependents(&self, reference: &str) -> Option<&IndexSet<String>> {
        self.dependents.get(reference)
    }

    /// Check if `key` still has outstanding references
    pub fn is_pending(&self, key: &str) -> bool {
        self.needs.contains_key(key)
    }

    /// Referenced names that still have waiting keys
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.dependents.keys().map(String::as_str)
    }

    /// Keys with outstanding references, in extraction order
    pub fn pending(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.needs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if no references remain
    pub fn is_empty(&self) -> bool {
        self.needs.is_empty() && self.dependents.is_empty()
    }
}

/// Resolve every `$ref{}` placeholder in the context
///
/// A reference to a sequence replaces the referencing value as a whole,
/// dropping any text around the placeholder. Other values are substituted
/// using their display form.
pub fn resolve_references(mut context: Context) -> Result<Context> {
    let mut graph = DependencyGraph::from_context(&context);
    let mut sweep = 0usize;

    while !graph.is_empty() {
        sweep += 1;

        // Ready: the target exists and is itself fully literal
        let ready: Vec<String> = graph
            .references()
            .filter(|r| context.contains_key(*r) && !graph.is_pending(r))
            .map(str::to_string)
            .collect();

        if ready.is_empty() {
            break;
        }

        for reference in &ready {
            let dependents = graph.remove_reference(reference);
            let Some(value) = context.get(reference).cloned() else {
                continue;
            };
            for key in &dependents {
                replace_reference(&mut context, key, reference, &value);
            }
        }

        log::debug!("Reference sweep {} resolved {} reference(s)", sweep, ready.len());
    }

    if graph.is_empty() {
        return Ok(context);
    }

    let mut keys = Vec::new();
    let mut pending = Vec::new();
    for (key, needs) in graph.pending() {
        keys.push(key.to_string());
        for reference in needs {
            let suffix = if context.contains_key(reference) {
                ""
            } else {
                " (not defined)"
            };
            pending.push(format!(
                "{} -> {}{}",
                key,
                placeholder::token(PlaceholderKind::Ref, reference),
                suffix
            ));
        }
    }

    Err(Error::unresolved_reference(keys, pending))
}

fn replace_reference(context: &mut Context, key: &str, reference: &str, value: &Value) {
    let Some(current) = context.get_mut(key) else {
        return;
    };

    match value {
        // Known limitation: the list replaces the whole dependent value
        Value::Sequence(_) => {
            log::trace!("'{}' replaced by list value of '{}'", key, reference);
            *current = value.clone();
        }
        _ => {
            if let Value::String(s) = current {
                let token = placeholder::token(PlaceholderKind::Ref, reference);
                *s = s.replace(&token, &value.to_string());
                log::trace!("Substituted {} in '{}'", token, key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ResolverErrorKind};
    use pretty_assertions::assert_eq;

    fn context(entries: &[(&str, Value)]) -> Context {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn unresolved_keys(err: &Error) -> Vec<String> {
        match &err.kind {
            ErrorKind::Resolver(ResolverErrorKind::UnresolvedReference { keys }) => keys.clone(),
            other => panic!("Expected UnresolvedReference, got {:?}", other),
        }
    }

    fn file_context() -> Context {
        context(&[
            ("fa", Value::from("AAA")),
            ("fa1", Value::from("$ref{fa}")),
            ("fa2", Value::from("$ref{fa1}")),
            ("fb", Value::from("BBB")),
            ("fb1", Value::from("$ref{fa}-$ref{fb}")),
            ("fb2", Value::from("$ref{fa1}-$ref{fb}")),
        ])
    }

    #[test]
    fn test_graph_views_agree() {
        let graph = DependencyGraph::from_context(&file_context());

        for (key, needs) in graph.pending() {
            for reference in needs {
                assert!(graph.dependents(reference).unwrap().contains(key));
            }
        }
        for reference in graph.references() {
            for key in graph.dependents(reference).unwrap() {
                assert!(graph.needs(key).unwrap().contains(reference));
            }
        }
    }

    #[test]
    fn test_graph_extraction() {
        let graph = DependencyGraph::from_context(&file_context());

        let fb2: Vec<&str> = graph.needs("fb2").unwrap().iter().map(String::as_str).collect();
        assert_eq!(fb2, vec!["fa1", "fb"]);

        let fa: Vec<&str> = graph.dependents("fa").unwrap().iter().map(String::as_str).collect();
        assert_eq!(fa, vec!["fa1", "fb1"]);

        assert!(!graph.is_pending("fa"));
        assert!(graph.is_pending("fa2"));
    }

    #[test]
    fn test_graph_remove_reference() {
        let mut graph = DependencyGraph::from_context(&file_context());

        let removed = graph.remove_reference("fb");
        assert_eq!(removed.len(), 2);
        assert!(graph.dependents("fb").is_none());
        // fb1 still waits on fa
        assert!(graph.is_pending("fb1"));

        graph.remove_reference("fa");
        assert!(!graph.is_pending("fb1"));
        assert!(!graph.is_pending("fa1"));
        assert!(graph.is_pending("fa2"));

        graph.remove_reference("fa1");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_chain_and_concatenation() {
        let resolved = resolve_references(file_context()).unwrap();

        assert_eq!(resolved["fa"].as_str(), Some("AAA"));
        assert_eq!(resolved["fa1"].as_str(), Some("AAA"));
        assert_eq!(resolved["fa2"].as_str(), Some("AAA"));
        assert_eq!(resolved["fb1"].as_str(), Some("AAA-BBB"));
        assert_eq!(resolved["fb2"].as_str(), Some("AAA-BBB"));
    }

    #[test]
    fn test_chain_declared_out_of_order() {
        let ctx = context(&[
            ("k2", Value::from("$ref{k1}")),
            ("k1", Value::from("$ref{k0}")),
            ("k0", Value::from("V")),
        ]);
        let resolved = resolve_references(ctx).unwrap();

        assert_eq!(resolved["k0"].as_str(), Some("V"));
        assert_eq!(resolved["k1"].as_str(), Some("V"));
        assert_eq!(resolved["k2"].as_str(), Some("V"));
    }

    #[test]
    fn test_repeated_reference_in_one_value() {
        let ctx = context(&[
            ("a", Value::from("X")),
            ("b", Value::from("$ref{a}$ref{a}$ref{a}")),
        ]);
        let resolved = resolve_references(ctx).unwrap();
        assert_eq!(resolved["b"].as_str(), Some("XXX"));
    }

    #[test]
    fn test_cycle_names_both_keys() {
        let ctx = context(&[
            ("fc", Value::from("$ref{fd}")),
            ("fd", Value::from("$ref{fc}")),
        ]);
        let err = resolve_references(ctx).unwrap_err();

        assert_eq!(unresolved_keys(&err), vec!["fc".to_string(), "fd".to_string()]);
        let display = err.to_string();
        assert!(display.contains("fc -> $ref{fd}"));
        assert!(display.contains("fd -> $ref{fc}"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let ctx = context(&[("a", Value::from("prefix-$ref{a}"))]);
        let err = resolve_references(ctx).unwrap_err();
        assert_eq!(unresolved_keys(&err), vec!["a".to_string()]);
    }

    #[test]
    fn test_missing_reference_names_key() {
        let ctx = context(&[("fe", Value::from("$ref{fz}"))]);
        let err = resolve_references(ctx).unwrap_err();

        assert_eq!(unresolved_keys(&err), vec!["fe".to_string()]);
        assert!(err.to_string().contains("fe -> $ref{fz} (not defined)"));
    }

    #[test]
    fn test_blocked_chain_behind_missing_reference() {
        let ctx = context(&[
            ("ok", Value::from("fine")),
            ("uses_ok", Value::from("$ref{ok}")),
            ("s", Value::from("$ref{r}")),
            ("r", Value::from("$ref{nonexistent}")),
        ]);
        let err = resolve_references(ctx).unwrap_err();
        assert_eq!(unresolved_keys(&err), vec!["s".to_string(), "r".to_string()]);
    }

    #[test]
    fn test_list_reference_replaces_whole_value() {
        let ctx = context(&[
            ("hosts", Value::from(vec!["a", "b"])),
            ("copy", Value::from("$ref{hosts}")),
            ("decorated", Value::from("prefix-$ref{hosts}-suffix")),
        ]);
        let resolved = resolve_references(ctx).unwrap();

        assert_eq!(resolved["copy"], Value::from(vec!["a", "b"]));
        // Surrounding text is discarded
        assert_eq!(resolved["decorated"], Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_list_then_other_reference() {
        let ctx = context(&[
            ("hosts", Value::from(vec!["a"])),
            ("name", Value::from("n")),
            ("mixed", Value::from("$ref{hosts}/$ref{name}")),
        ]);
        let resolved = resolve_references(ctx).unwrap();
        assert_eq!(resolved["mixed"], Value::from(vec!["a"]));
    }

    #[test]
    fn test_scalar_reference_uses_display() {
        let ctx = context(&[
            ("port", Value::Integer(9443)),
            ("secure", Value::Bool(true)),
            ("url", Value::from("https://localhost:$ref{port}?s=$ref{secure}")),
        ]);
        let resolved = resolve_references(ctx).unwrap();
        assert_eq!(resolved["url"].as_str(), Some("https://localhost:9443?s=true"));
    }

    #[test]
    fn test_sequence_elements_not_extracted() {
        let ctx = context(&[("list", Value::from(vec!["$ref{nowhere}"]))]);
        let resolved = resolve_references(ctx.clone()).unwrap();
        assert_eq!(resolved, ctx);
    }

    #[test]
    fn test_resolved_context_is_fixpoint() {
        let once = resolve_references(file_context()).unwrap();
        let twice = resolve_references(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_diamond_dependencies() {
        let ctx = context(&[
            ("top", Value::from("$ref{left}|$ref{right}")),
            ("left", Value::from("L:$ref{base}")),
            ("right", Value::from("R:$ref{base}")),
            ("base", Value::from("B")),
        ]);
        let resolved = resolve_references(ctx).unwrap();
        assert_eq!(resolved["top"].as_str(), Some("L:B|R:B"));
    }
}
