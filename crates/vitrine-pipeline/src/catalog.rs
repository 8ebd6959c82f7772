//! The example catalog.
//!
//! A static, ordered, grouped list of named examples. Entries are registered
//! once at startup; bodies are fetched lazily through the host's fetch
//! capability and cached for the session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::StoreError;

/// One catalog entry. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleEntry {
    /// Display name for menus.
    pub name: String,
    /// Menu group.
    pub group: String,
    /// Stable identifier used in share links.
    pub slug: String,
}

impl ExampleEntry {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            slug: slug.into(),
        }
    }
}

/// Resolves an example slug to its source body (asynchronous I/O on the
/// host side; the pipeline awaits completion before populating the editor).
pub trait ExampleFetcher {
    fn fetch(&self, slug: &str) -> Result<String, StoreError>;
}

/// The session's example catalog with its body cache.
pub struct Catalog {
    entries: Vec<ExampleEntry>,
    bodies: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(entries: Vec<ExampleEntry>) -> Self {
        Self {
            entries,
            bodies: BTreeMap::new(),
        }
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[ExampleEntry] {
        &self.entries
    }

    pub fn find(&self, slug: &str) -> Option<&ExampleEntry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    /// Preload a body into the cache (used by hosts that bundle example
    /// sources instead of fetching).
    pub fn preload(&mut self, slug: impl Into<String>, body: impl Into<String>) {
        self.bodies.insert(slug.into(), body.into());
    }

    /// The body for `slug`, fetching and caching on first access.
    pub fn body(
        &mut self,
        slug: &str,
        fetcher: &dyn ExampleFetcher,
    ) -> Result<String, StoreError> {
        if self.find(slug).is_none() {
            return Err(StoreError::Fetch(format!("unknown example '{slug}'")));
        }
        if let Some(body) = self.bodies.get(slug) {
            return Ok(body.clone());
        }
        let body = fetcher.fetch(slug)?;
        debug!(target: "vitrine::store", slug, bytes = body.len(), "example fetched");
        self.bodies.insert(slug.to_string(), body.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl ExampleFetcher for CountingFetcher {
        fn fetch(&self, slug: &str) -> Result<String, StoreError> {
            self.calls.set(self.calls.get() + 1);
            match slug {
                "counter" => Ok("let count = 0".to_string()),
                other => Err(StoreError::Fetch(format!("404 for {other}"))),
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            ExampleEntry::new("Counter", "Basics", "counter"),
            ExampleEntry::new("Broken", "Basics", "broken"),
        ])
    }

    #[test]
    fn test_body_fetched_once_then_cached() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let mut catalog = catalog();
        assert_eq!(catalog.body("counter", &fetcher).unwrap(), "let count = 0");
        assert_eq!(catalog.body("counter", &fetcher).unwrap(), "let count = 0");
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_unknown_slug_is_error() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let mut catalog = catalog();
        assert!(catalog.body("missing", &fetcher).is_err());
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let mut catalog = catalog();
        assert!(catalog.body("broken", &fetcher).is_err());
    }

    #[test]
    fn test_preload_skips_fetch() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let mut catalog = catalog();
        catalog.preload("broken", "fixed body");
        assert_eq!(catalog.body("broken", &fetcher).unwrap(), "fixed body");
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_find_and_order() {
        let catalog = catalog();
        assert_eq!(catalog.entries()[0].slug, "counter");
        assert!(catalog.find("counter").is_some());
        assert!(catalog.find("nope").is_none());
    }
}
