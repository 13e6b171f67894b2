//! # Meridian Core
//!
//! Core types, contracts, and error handling for the Meridian GraphQL server.
//!
//! This crate provides the foundations shared by the runtime and plugins:
//! - Error types
//! - GraphQL wire types
//! - Schema and executor contracts
//! - Schema-derived data and the document cache

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod document;
pub mod error;
pub mod graphql;
pub mod landing_page;
pub mod schema;

pub use document::{parse_document, DocumentCache, ParseError};
pub use error::{Error, Result, STARTUP_FAILED_MESSAGE};
pub use graphql::{
    ErrorLocation, GraphQLError, GraphQLRequest, GraphQLResponse, HttpGraphQLResponse,
    HttpRequestHead, OperationKind,
};
pub use landing_page::LandingPage;
pub use schema::{schema_hash, Executor, GraphQLSchema, SchemaDerivedData, SchemaLoadOrUpdate};

// Re-export commonly used HTTP types
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::graphql::*;
    pub use crate::landing_page::LandingPage;
    pub use crate::schema::{Executor, GraphQLSchema, SchemaDerivedData, SchemaLoadOrUpdate};
}
