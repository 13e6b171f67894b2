//! GraphQL wire types shared between the runtime, plugins and transports

use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// GraphQL request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    /// GraphQL query document
    pub query: String,

    /// Operation name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    /// Variables (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    /// Request extensions (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLRequest {
    /// Create a request for a query document
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Set the operation name
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the variables
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// GraphQL response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// Response data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Errors (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,

    /// Extensions (optional)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl GraphQLResponse {
    /// Create a response carrying only errors
    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        Self {
            data: None,
            errors,
            extensions: Map::new(),
        }
    }

    /// Whether the response carries any error
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// GraphQL error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Error message
    pub message: String,

    /// Error locations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,

    /// Error path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,

    /// Extensions
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl GraphQLError {
    /// Create an error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set `extensions.code`
    pub fn with_code(mut self, code: &str) -> Self {
        self.extensions
            .insert("code".to_string(), Value::String(code.to_string()));
        self
    }

    /// `extensions.code`, if set
    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }
}

/// Error location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// Line number
    pub line: usize,

    /// Column number
    pub column: usize,
}

/// Kind of a resolved GraphQL operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read-only query
    Query,
    /// Mutation
    Mutation,
    /// Subscription
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// The HTTP facts about an incoming GraphQL request that the core needs
#[derive(Debug, Clone)]
pub struct HttpRequestHead {
    /// Request method
    pub method: Method,

    /// Request headers
    pub headers: HeaderMap,
}

impl HttpRequestHead {
    /// Create a request head with no headers
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
        }
    }

    /// Request head of a plain `POST`
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Request head of a plain `GET`
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A GraphQL response plus the HTTP status and headers the transport should use
#[derive(Debug, Clone)]
pub struct HttpGraphQLResponse {
    /// Response status
    pub status: StatusCode,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body
    pub body: GraphQLResponse,
}

impl HttpGraphQLResponse {
    /// A `200 OK` response
    pub fn ok(body: GraphQLResponse) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    /// A response with the given status
    pub fn with_status(status: StatusCode, body: GraphQLResponse) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: GraphQLRequest = serde_json::from_value(json!({
            "query": "query Q { hello }",
            "operationName": "Q",
            "variables": { "a": 1 }
        }))
        .unwrap();

        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert_eq!(request.variables, Some(json!({ "a": 1 })));
        assert!(request.extensions.is_none());
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let response = GraphQLResponse {
            data: Some(json!({ "hello": "world" })),
            ..GraphQLResponse::default()
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({ "data": { "hello": "world" } }));
    }

    #[test]
    fn test_error_code() {
        let error = GraphQLError::new("boom").with_code("INTERNAL_SERVER_ERROR");
        assert_eq!(error.code(), Some("INTERNAL_SERVER_ERROR"));
        assert_eq!(GraphQLError::new("plain").code(), None);
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::Mutation.to_string(), "mutation");
    }

    #[test]
    fn test_request_head_header_lookup() {
        let mut head = HttpRequestHead::get();
        head.headers
            .insert("x-test", http::HeaderValue::from_static("yes"));
        assert_eq!(head.header("x-test"), Some("yes"));
        assert_eq!(head.header("missing"), None);
    }
}
