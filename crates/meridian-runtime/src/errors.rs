//! Error formatting for GraphQL responses

use meridian_core::{
    Error, ErrorLocation, GraphQLError, GraphQLResponse, HttpGraphQLResponse, ParseError,
};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// Error code for documents that fail to parse
pub const GRAPHQL_PARSE_FAILED: &str = "GRAPHQL_PARSE_FAILED";

/// Error code for documents that fail validation
pub const GRAPHQL_VALIDATION_FAILED: &str = "GRAPHQL_VALIDATION_FAILED";

/// Error code when no operation can be selected from the document
pub const OPERATION_RESOLUTION_FAILURE: &str = "OPERATION_RESOLUTION_FAILURE";

/// Error code for errors without a more specific one
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// Fill in `extensions.code` and, when enabled, `extensions.stacktrace`.
///
/// A response with no data whose errors all lack a path failed before
/// execution and is answered with `400` and `GRAPHQL_VALIDATION_FAILED`.
pub(crate) fn format_response(
    mut response: GraphQLResponse,
    include_stacktrace: bool,
) -> HttpGraphQLResponse {
    let request_error = response.data.is_none()
        && !response.errors.is_empty()
        && response.errors.iter().all(|e| e.path.is_empty());

    let default_code = if request_error {
        GRAPHQL_VALIDATION_FAILED
    } else {
        INTERNAL_SERVER_ERROR
    };

    for error in &mut response.errors {
        format_error(error, default_code, include_stacktrace);
    }

    let status = if request_error {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    HttpGraphQLResponse::with_status(status, response)
}

fn format_error(error: &mut GraphQLError, default_code: &str, include_stacktrace: bool) {
    if error.code().is_none() {
        error
            .extensions
            .insert("code".to_string(), Value::String(default_code.to_string()));
    }

    if !include_stacktrace {
        error.extensions.remove("stacktrace");
        return;
    }

    let code = error.code().unwrap_or(default_code).to_string();
    let mut stacktrace = vec![Value::String(format!("{code}: {}", error.message))];
    if !error.path.is_empty() {
        let path: Vec<String> = error
            .path
            .iter()
            .map(|segment| match segment {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        stacktrace.push(Value::String(format!("    at {}", path.join("."))));
    }
    error
        .extensions
        .insert("stacktrace".to_string(), Value::Array(stacktrace));
}

/// Response for a request that failed before execution
pub(crate) fn request_error(
    message: impl Into<String>,
    code: &str,
    locations: Vec<ErrorLocation>,
    include_stacktrace: bool,
) -> HttpGraphQLResponse {
    let mut error = GraphQLError::new(message).with_code(code);
    error.locations = locations;
    format_error(&mut error, code, include_stacktrace);
    HttpGraphQLResponse::with_status(
        StatusCode::BAD_REQUEST,
        GraphQLResponse::from_errors(vec![error]),
    )
}

/// Response for a document the parser rejected
pub(crate) fn parse_failed(err: &ParseError, include_stacktrace: bool) -> HttpGraphQLResponse {
    let locations = err
        .positions()
        .map(|pos| ErrorLocation {
            line: pos.line,
            column: pos.column,
        })
        .collect();
    request_error(
        format!("Syntax Error: {err}"),
        GRAPHQL_PARSE_FAILED,
        locations,
        include_stacktrace,
    )
}

/// Response for a server error raised while handling a request
pub(crate) fn from_error(err: &Error, include_stacktrace: bool) -> HttpGraphQLResponse {
    let mut error = GraphQLError::new(err.to_string()).with_code(err.extension_code());
    format_error(&mut error, err.extension_code(), include_stacktrace);

    let mut headers = HeaderMap::new();
    if let Error::Http {
        headers: required, ..
    } = err
    {
        for (name, value) in required {
            headers.insert(name.clone(), value.clone());
        }
    }

    HttpGraphQLResponse {
        status: err.to_status_code(),
        headers,
        body: GraphQLResponse::from_errors(vec![error]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{header, HeaderValue};
    use serde_json::json;

    fn resolver_error() -> GraphQLResponse {
        GraphQLResponse {
            data: Some(json!({ "error": null })),
            errors: vec![GraphQLError {
                path: vec![json!("error")],
                ..GraphQLError::new("boom")
            }],
            ..GraphQLResponse::default()
        }
    }

    #[test]
    fn test_resolver_error_gets_internal_code() {
        let response = format_response(resolver_error(), false);

        assert_eq!(response.status, StatusCode::OK);
        let error = &response.body.errors[0];
        assert_eq!(error.code(), Some(INTERNAL_SERVER_ERROR));
        assert!(!error.extensions.contains_key("stacktrace"));
    }

    #[test]
    fn test_stacktrace_when_enabled() {
        let response = format_response(resolver_error(), true);

        let stacktrace = response.body.errors[0].extensions["stacktrace"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(stacktrace[0], json!("INTERNAL_SERVER_ERROR: boom"));
        assert_eq!(stacktrace[1], json!("    at error"));
    }

    #[test]
    fn test_pathless_errors_without_data_are_validation_failures() {
        let response = format_response(
            GraphQLResponse::from_errors(vec![GraphQLError::new("Unknown field \"missing\"")]),
            false,
        );

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body.errors[0].code(), Some(GRAPHQL_VALIDATION_FAILED));
    }

    #[test]
    fn test_existing_code_is_kept() {
        let mut response = resolver_error();
        response.errors[0] = response.errors[0].clone().with_code("FORBIDDEN");

        let response = format_response(response, false);
        assert_eq!(response.body.errors[0].code(), Some("FORBIDDEN"));
    }

    #[test]
    fn test_http_error_carries_status_and_headers() {
        let err = Error::http(
            StatusCode::METHOD_NOT_ALLOWED,
            vec![(header::ALLOW, HeaderValue::from_static("POST"))],
            "GET requests only support query operations",
        );

        let response = from_error(&err, false);
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers.get(header::ALLOW).unwrap(), "POST");
        assert_eq!(response.body.errors[0].code(), Some("BAD_REQUEST"));
    }

    #[test]
    fn test_parse_failure() {
        let err = meridian_core::parse_document("{ hello").unwrap_err();
        let response = parse_failed(&err, false);

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body.errors[0].code(), Some(GRAPHQL_PARSE_FAILED));
        assert!(response.body.errors[0].message.starts_with("Syntax Error"));
        assert!(!response.body.errors[0].locations.is_empty());
    }
}
