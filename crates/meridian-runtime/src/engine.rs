//! async-graphql engine adapter

use async_graphql::{ObjectType, Schema, SubscriptionType, Variables};
use async_trait::async_trait;
use meridian_core::{Executor, GraphQLError, GraphQLRequest, GraphQLResponse, GraphQLSchema};
use std::fmt;

/// Adapts an [`async_graphql::Schema`] to [`GraphQLSchema`]
pub struct AsyncGraphQLSchema<Query, Mutation, Subscription> {
    schema: Schema<Query, Mutation, Subscription>,
    federated: bool,
}

impl<Query, Mutation, Subscription> AsyncGraphQLSchema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    /// Wrap a schema
    pub fn new(schema: Schema<Query, Mutation, Subscription>) -> Self {
        Self {
            schema,
            federated: false,
        }
    }

    /// Mark the schema as a federated composition
    pub fn federated(mut self, federated: bool) -> Self {
        self.federated = federated;
        self
    }
}

impl<Query, Mutation, Subscription> fmt::Debug for AsyncGraphQLSchema<Query, Mutation, Subscription> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncGraphQLSchema")
            .field("federated", &self.federated)
            .finish()
    }
}

#[async_trait]
impl<Query, Mutation, Subscription> Executor for AsyncGraphQLSchema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    async fn execute(&self, request: &GraphQLRequest) -> GraphQLResponse {
        let mut engine_request = async_graphql::Request::new(request.query.clone());
        if let Some(name) = &request.operation_name {
            engine_request = engine_request.operation_name(name.clone());
        }
        if let Some(variables) = &request.variables {
            engine_request = engine_request.variables(Variables::from_json(variables.clone()));
        }

        convert_response(self.schema.execute(engine_request).await)
    }
}

impl<Query, Mutation, Subscription> GraphQLSchema for AsyncGraphQLSchema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    fn sdl(&self) -> String {
        self.schema.sdl()
    }

    fn is_federated(&self) -> bool {
        self.federated
    }
}

fn convert_response(response: async_graphql::Response) -> GraphQLResponse {
    let errors: Vec<GraphQLError> = response
        .errors
        .iter()
        .map(|error| {
            serde_json::to_value(error)
                .and_then(serde_json::from_value)
                .unwrap_or_else(|_| GraphQLError::new(error.message.clone()))
        })
        .collect();

    let data = match serde_json::to_value(&response.data) {
        Ok(serde_json::Value::Null) | Err(_) if !errors.is_empty() => None,
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response data");
            None
        }
    };

    let extensions = serde_json::to_value(&response.extensions)
        .ok()
        .and_then(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    GraphQLResponse {
        data,
        errors,
        extensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{EmptyMutation, EmptySubscription, Object};
    use serde_json::json;

    struct Query;

    #[Object]
    impl Query {
        async fn hello(&self, name: Option<String>) -> String {
            format!("hello {}", name.unwrap_or_else(|| "world".to_string()))
        }

        async fn error(&self) -> async_graphql::Result<Option<String>> {
            Err("boom".into())
        }
    }

    fn schema() -> AsyncGraphQLSchema<Query, EmptyMutation, EmptySubscription> {
        AsyncGraphQLSchema::new(Schema::new(Query, EmptyMutation, EmptySubscription))
    }

    #[tokio::test]
    async fn test_executes_with_variables() {
        let request = GraphQLRequest::new("query Q($name: String) { hello(name: $name) }")
            .operation_name("Q")
            .variables(json!({ "name": "meridian" }));

        let response = schema().execute(&request).await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data, Some(json!({ "hello": "hello meridian" })));
    }

    #[tokio::test]
    async fn test_resolver_error_keeps_path() {
        let response = schema().execute(&GraphQLRequest::new("{ error }")).await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "boom");
        assert_eq!(response.errors[0].path, vec![json!("error")]);
        assert_eq!(response.data, Some(json!({ "error": null })));
    }

    #[tokio::test]
    async fn test_validation_error_has_no_data() {
        let response = schema().execute(&GraphQLRequest::new("{ missing }")).await;
        assert!(response.data.is_none());
        assert!(response.errors[0].path.is_empty());
    }

    #[test]
    fn test_sdl_and_federation_flag() {
        let schema = schema().federated(true);
        assert!(schema.sdl().contains("hello"));
        assert!(schema.is_federated());
    }
}
