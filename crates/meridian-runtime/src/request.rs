//! Request pipeline
//!
//! Gate, plugin request hooks, parse, operation selection, policy checks,
//! execution, then response formatting.

use crate::errors::{self, GRAPHQL_VALIDATION_FAILED, OPERATION_RESOLUTION_FAILURE};
use crate::lifecycle::Lifecycle;
use async_graphql::parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql::Name;
use meridian_core::{
    parse_document, GraphQLRequest, HttpGraphQLResponse, HttpRequestHead, OperationKind, Result,
    SchemaDerivedData,
};
use meridian_plugins::{RequestContext, RequestListener, ResolvedOperation};
use std::collections::HashSet;
use std::sync::Arc;

const INTROSPECTION_DISABLED_MESSAGE: &str = "GraphQL introspection is not allowed, but the query \
     contained __schema or __type. To enable introspection, set server.introspection to true";

type Listeners<'a> = Vec<(&'a str, Arc<dyn RequestListener>)>;

impl Lifecycle {
    /// Run one GraphQL request.
    ///
    /// Fails only when the server is not accepting operations; every other
    /// failure becomes a GraphQL error response.
    pub(crate) async fn execute_http_request(
        &self,
        http: HttpRequestHead,
        request: GraphQLRequest,
    ) -> Result<HttpGraphQLResponse> {
        let derived = self.schema_derived_data_for_operation().await?;
        let include_stacktrace = self.config.server.include_stacktrace();

        let ctx = RequestContext {
            request,
            http,
            schema_hash: derived.schema_hash.clone(),
        };

        let mut listeners: Listeners<'_> = Vec::new();
        for registration in &self.plugins {
            match registration.plugin.request_did_start(&ctx).await {
                Ok(Some(listener)) => listeners.push((registration.name(), listener)),
                Ok(None) => {}
                Err(e) => {
                    let err = e.into_error(registration.name());
                    return Ok(errors::from_error(&err, include_stacktrace));
                }
            }
        }

        let (operation, mut response) = self
            .process_request(&ctx, &derived, &listeners, include_stacktrace)
            .await;

        for (_, listener) in &listeners {
            listener
                .will_send_response(&ctx, operation.as_ref(), &mut response)
                .await;
        }

        Ok(response)
    }

    async fn process_request(
        &self,
        ctx: &RequestContext,
        derived: &SchemaDerivedData,
        listeners: &Listeners<'_>,
        include_stacktrace: bool,
    ) -> (Option<ResolvedOperation>, HttpGraphQLResponse) {
        let query = ctx.request.query.as_str();
        let parsed = match &derived.document_cache {
            Some(cache) => cache.get_or_parse(query),
            None => parse_document(query).map(Arc::new),
        };
        let document = match parsed {
            Ok(document) => document,
            Err(e) => return (None, errors::parse_failed(&e, include_stacktrace)),
        };

        let (operation, definition) =
            match select_operation(&document, ctx.request.operation_name.as_deref()) {
                Ok(selected) => selected,
                Err(message) => {
                    let response = errors::request_error(
                        message,
                        OPERATION_RESOLUTION_FAILURE,
                        Vec::new(),
                        include_stacktrace,
                    );
                    return (None, response);
                }
            };

        if !self.config.server.introspection_enabled()
            && selects_introspection(&document, &definition.selection_set.node, &mut HashSet::new())
        {
            let response = errors::request_error(
                INTROSPECTION_DISABLED_MESSAGE,
                GRAPHQL_VALIDATION_FAILED,
                Vec::new(),
                include_stacktrace,
            );
            return (Some(operation), response);
        }

        for (name, listener) in listeners {
            if let Err(e) = listener.did_resolve_operation(ctx, &operation).await {
                tracing::debug!(plugin = %name, error = %e, "Plugin rejected operation");
                let response = errors::from_error(&e.into_error(name), include_stacktrace);
                return (Some(operation), response);
            }
        }

        let executor = self.executor_override.read().clone();
        let raw = match executor {
            Some(executor) => executor.execute(&ctx.request).await,
            None => derived.schema.execute(&ctx.request).await,
        };

        (
            Some(operation),
            errors::format_response(raw, include_stacktrace),
        )
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<(ResolvedOperation, &'a OperationDefinition), String> {
    let (name, definition) = match (&document.operations, operation_name) {
        (DocumentOperations::Single(definition), None) => (None, &definition.node),
        (DocumentOperations::Single(_), Some(requested)) => {
            return Err(format!("Unknown operation named \"{requested}\"."))
        }
        (DocumentOperations::Multiple(operations), Some(requested)) => {
            match operations.get(requested) {
                Some(definition) => (Some(requested.to_string()), &definition.node),
                None => return Err(format!("Unknown operation named \"{requested}\".")),
            }
        }
        (DocumentOperations::Multiple(operations), None) => {
            let mut iter = operations.iter();
            match (iter.next(), iter.next()) {
                (Some((name, definition)), None) => (Some(name.to_string()), &definition.node),
                _ => {
                    return Err(
                        "Must provide operation name if query contains multiple operations."
                            .to_string(),
                    )
                }
            }
        }
    };

    let kind = match definition.ty {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => OperationKind::Subscription,
    };

    Ok((ResolvedOperation { kind, name }, definition))
}

/// Whether the selection set reaches `__schema` or `__type` at the top level,
/// looking through fragments
fn selects_introspection(
    document: &ExecutableDocument,
    selection_set: &SelectionSet,
    visited: &mut HashSet<Name>,
) -> bool {
    selection_set.items.iter().any(|selection| match &selection.node {
        Selection::Field(field) => matches!(field.node.name.node.as_str(), "__schema" | "__type"),
        Selection::InlineFragment(fragment) => {
            selects_introspection(document, &fragment.node.selection_set.node, visited)
        }
        Selection::FragmentSpread(spread) => {
            let name = &spread.node.fragment_name.node;
            visited.insert(name.clone())
                && document.fragments.get(name).is_some_and(|fragment| {
                    selects_introspection(document, &fragment.node.selection_set.node, visited)
                })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(query: &str, name: Option<&str>) -> Result<ResolvedOperation, String> {
        let document = parse_document(query).unwrap();
        select_operation(&document, name).map(|(operation, _)| operation)
    }

    fn introspects(query: &str) -> bool {
        let document = parse_document(query).unwrap();
        let (_, definition) = select_operation(&document, None).unwrap();
        selects_introspection(&document, &definition.selection_set.node, &mut HashSet::new())
    }

    #[test]
    fn test_selects_anonymous_operation() {
        let operation = select("{ hello }", None).unwrap();
        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.name, None);
    }

    #[test]
    fn test_selects_named_operation() {
        let query = "query A { hello } mutation B { bump }";
        let operation = select(query, Some("B")).unwrap();
        assert_eq!(operation.kind, OperationKind::Mutation);
        assert_eq!(operation.name.as_deref(), Some("B"));

        let err = select(query, None).unwrap_err();
        assert!(err.contains("Must provide operation name"));

        let err = select(query, Some("C")).unwrap_err();
        assert_eq!(err, "Unknown operation named \"C\".");
    }

    #[test]
    fn test_single_named_operation_needs_no_name() {
        let operation = select("mutation Bump { bump }", None).unwrap();
        assert_eq!(operation.kind, OperationKind::Mutation);
        assert_eq!(operation.name.as_deref(), Some("Bump"));
    }

    #[test]
    fn test_detects_introspection_through_fragments() {
        assert!(introspects("{ __schema { types { name } } }"));
        assert!(introspects("{ ... on Query { __type(name: \"Query\") { name } } }"));
        assert!(introspects(
            "query { ...Intro } fragment Intro on Query { __schema { queryType { name } } }"
        ));
        assert!(!introspects("{ hello __typename }"));
    }

    #[test]
    fn test_recursive_fragments_terminate() {
        assert!(!introspects(
            "query { ...A } fragment A on Query { hello ...B } fragment B on Query { ...A }"
        ));
    }
}
