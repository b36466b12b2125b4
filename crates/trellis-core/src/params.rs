//! Captured path parameters
//!
//! One map per request, populated during route resolution and owned
//! exclusively by that request's context. Exclusive `&mut` ownership is what
//! makes concurrent requests safe: each in-flight request mutates its own
//! instance, never a shared one.

use std::collections::HashMap;

/// Name to captured-value map for one request.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    entries: HashMap<String, String>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a captured parameter. Re-capturing a name replaces its value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut params = ParamMap::new();
        params.insert("name", "alice");
        assert_eq!(params.get("name"), Some("alice"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut params = ParamMap::new();
        params.insert("id", "1");
        params.insert("id", "2");
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut params = ParamMap::new();
        params.insert("id", "1");
        params.clear();
        assert!(params.is_empty());
    }
}
