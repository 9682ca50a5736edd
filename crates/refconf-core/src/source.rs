//! Lookup sources for `$sys{}` and `$env{}` placeholders
//!
//! A [`PropertySource`] answers "what is the value of this name". The
//! built-in sources read the process environment and a process-wide system
//! property table; [`PropertyTable`] is also usable on its own for tests or
//! embedding.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Trait for name/value lookup sources
pub trait PropertySource: Send + Sync {
    /// Look up a value by name
    fn get(&self, name: &str) -> Option<String>;

    /// Get the name of this source
    fn name(&self) -> &str;
}

/// In-memory property table
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    properties: HashMap<String, String>,
}

impl PropertyTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.insert(name.into(), value.into())
    }

    /// Remove a property, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    /// Check if a property is defined
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Number of properties in the table
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertySource for PropertyTable {
    fn get(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn name(&self) -> &str {
        "table"
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Process-wide system property table
static SYSTEM_PROPERTIES: OnceLock<RwLock<PropertyTable>> = OnceLock::new();

/// Get the process-wide system property table.
///
/// The table starts empty. Front ends fill it (for example from `-D`
/// command-line flags) before running a resolution.
pub fn system_properties() -> &'static RwLock<PropertyTable> {
    SYSTEM_PROPERTIES.get_or_init(|| RwLock::new(PropertyTable::new()))
}

/// Set a process-wide system property, returning the previous value
pub fn set_system_property(name: impl Into<String>, value: impl Into<String>) -> Option<String> {
    let mut table = system_properties()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    table.set(name, value)
}

/// Remove a process-wide system property, returning its value
pub fn clear_system_property(name: &str) -> Option<String> {
    let mut table = system_properties()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    table.remove(name)
}

/// Source reading the process-wide system property table
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProperties;

impl PropertySource for SystemProperties {
    fn get(&self, name: &str) -> Option<String> {
        let table = system_properties()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.get(name)
    }

    fn name(&self) -> &str {
        "sys"
    }
}

/// Source reading process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct Environment;

impl PropertySource for Environment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn name(&self) -> &str {
        "env"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_table_builder() {
        let table = PropertyTable::new()
            .with("syskey1", "sysval1")
            .with("syskey2", "sysval2");

        assert_eq!(table.get("syskey1").as_deref(), Some("sysval1"));
        assert_eq!(table.get("syskey2").as_deref(), Some("sysval2"));
        assert_eq!(table.get("syskey3"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_property_table_set_and_remove() {
        let mut table = PropertyTable::new();
        assert_eq!(table.set("a", "1"), None);
        assert_eq!(table.set("a", "2"), Some("1".to_string()));
        assert!(table.contains("a"));
        assert_eq!(table.remove("a"), Some("2".to_string()));
        assert!(table.is_empty());
    }

    #[test]
    fn test_property_table_from_iter() {
        let table: PropertyTable = vec![("k", "v")].into_iter().collect();
        assert_eq!(table.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_system_properties_global_table() {
        set_system_property("REFCONF_SOURCE_TEST_PROP", "value");

        let source = SystemProperties;
        assert_eq!(
            source.get("REFCONF_SOURCE_TEST_PROP").as_deref(),
            Some("value")
        );

        assert_eq!(
            clear_system_property("REFCONF_SOURCE_TEST_PROP").as_deref(),
            Some("value")
        );
        assert_eq!(source.get("REFCONF_SOURCE_TEST_PROP"), None);
    }

    #[test]
    fn test_environment_source() {
        std::env::set_var("REFCONF_SOURCE_TEST_VAR", "from_env");

        let source = Environment;
        assert_eq!(
            source.get("REFCONF_SOURCE_TEST_VAR").as_deref(),
            Some("from_env")
        );
        assert_eq!(source.name(), "env");

        std::env::remove_var("REFCONF_SOURCE_TEST_VAR");
        assert_eq!(source.get("REFCONF_SOURCE_TEST_VAR"), None);
    }
}
