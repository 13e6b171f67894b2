//! Parsed document cache

use async_graphql::parser::{self, types::ExecutableDocument};
use moka::sync::Cache;
use std::fmt;
use std::sync::Arc;

/// Parse error reported by the GraphQL parser
pub type ParseError = parser::Error;

/// Bounded cache of parsed GraphQL documents keyed by query text
#[derive(Clone)]
pub struct DocumentCache {
    inner: Cache<String, Arc<ExecutableDocument>>,
}

impl DocumentCache {
    /// Create a cache holding at most `max_entries` documents
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::new(max_entries),
        }
    }

    /// Return the cached document for `query`, parsing and caching it on a miss.
    ///
    /// Parse failures are not cached.
    pub fn get_or_parse(&self, query: &str) -> Result<Arc<ExecutableDocument>, ParseError> {
        if let Some(document) = self.inner.get(query) {
            return Ok(document);
        }

        let document = Arc::new(parse_document(query)?);
        self.inner.insert(query.to_string(), document.clone());
        Ok(document)
    }

    /// Whether `query` is cached
    pub fn contains(&self, query: &str) -> bool {
        self.inner.contains_key(query)
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

/// Parse a query document without caching
pub fn parse_document(query: &str) -> Result<ExecutableDocument, ParseError> {
    parser::parse_query(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_returns_same_document() {
        let cache = DocumentCache::new(8);
        let first = cache.get_or_parse("{ hello }").unwrap();
        let second = cache.get_or_parse("{ hello }").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parse_failure_not_cached() {
        let cache = DocumentCache::new(8);
        assert!(cache.get_or_parse("{ hello").is_err());
        assert!(!cache.contains("{ hello"));
    }
}
