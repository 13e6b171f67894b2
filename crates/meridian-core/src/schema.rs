//! Schema and executor contracts plus the data derived from an active schema

use crate::document::DocumentCache;
use crate::graphql::{GraphQLRequest, GraphQLResponse};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Something that can execute a GraphQL request
#[async_trait]
pub trait Executor: Send + Sync + fmt::Debug {
    /// Execute a request and produce a response
    async fn execute(&self, request: &GraphQLRequest) -> GraphQLResponse;
}

/// An executable GraphQL schema
pub trait GraphQLSchema: Executor {
    /// Schema definition language of the API schema
    fn sdl(&self) -> String;

    /// Whether this schema is a federated composition
    fn is_federated(&self) -> bool {
        false
    }
}

/// Lowercase hex SHA-256 of a schema SDL
pub fn schema_hash(sdl: &str) -> String {
    format!("{:x}", Sha256::digest(sdl.as_bytes()))
}

/// Data derived from one schema instance.
///
/// Rebuilt from scratch whenever the schema changes, so a document cache is
/// never shared between two schemas.
pub struct SchemaDerivedData {
    /// The active schema
    pub schema: Arc<dyn GraphQLSchema>,

    /// Hash of the schema SDL
    pub schema_hash: String,

    /// Parsed document cache, if enabled
    pub document_cache: Option<DocumentCache>,
}

impl SchemaDerivedData {
    /// Derive data for `schema`, with a document cache of `cache_capacity`
    /// entries when set
    pub fn new(schema: Arc<dyn GraphQLSchema>, cache_capacity: Option<u64>) -> Self {
        let schema_hash = schema_hash(&schema.sdl());
        Self {
            schema,
            schema_hash,
            document_cache: cache_capacity.map(DocumentCache::new),
        }
    }
}

impl fmt::Debug for SchemaDerivedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDerivedData")
            .field("schema_hash", &self.schema_hash)
            .field("federated", &self.schema.is_federated())
            .field("document_cache", &self.document_cache)
            .finish()
    }
}

/// Payload delivered to schema update listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLoadOrUpdate {
    /// SDL of the API schema
    pub api_schema: String,

    /// SDL of the core supergraph, for federated compositions
    pub core_supergraph_sdl: Option<String>,
}

impl SchemaLoadOrUpdate {
    /// Build the payload for a schema
    pub fn from_schema(schema: &dyn GraphQLSchema) -> Self {
        let sdl = schema.sdl();
        Self {
            core_supergraph_sdl: schema.is_federated().then(|| sdl.clone()),
            api_schema: sdl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedSchema(&'static str);

    #[async_trait]
    impl Executor for FixedSchema {
        async fn execute(&self, _request: &GraphQLRequest) -> GraphQLResponse {
            GraphQLResponse::default()
        }
    }

    impl GraphQLSchema for FixedSchema {
        fn sdl(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_schema_hash_is_lowercase_sha256() {
        let hash = schema_hash("type Query { hello: String }");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(hash, schema_hash("type Query { hello: String }"));
        assert_ne!(hash, schema_hash("type Query { bye: String }"));
    }

    #[test]
    fn test_derived_data_gets_fresh_cache() {
        let schema: Arc<dyn GraphQLSchema> = Arc::new(FixedSchema("type Query { a: Int }"));

        let first = SchemaDerivedData::new(schema.clone(), Some(10));
        let second = SchemaDerivedData::new(schema, Some(10));

        let cache = first.document_cache.as_ref().unwrap();
        cache.get_or_parse("{ a }").unwrap();
        assert!(cache.contains("{ a }"));
        assert!(!second.document_cache.as_ref().unwrap().contains("{ a }"));
        assert_eq!(first.schema_hash, second.schema_hash);
    }

    #[test]
    fn test_derived_data_without_cache() {
        let data = SchemaDerivedData::new(Arc::new(FixedSchema("type Query { a: Int }")), None);
        assert!(data.document_cache.is_none());
    }

    #[test]
    fn test_load_or_update_payload() {
        let payload = SchemaLoadOrUpdate::from_schema(&FixedSchema("type Query { a: Int }"));
        assert_eq!(payload.api_schema, "type Query { a: Int }");
        assert!(payload.core_supergraph_sdl.is_none());
    }
}
