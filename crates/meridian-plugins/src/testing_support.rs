use async_trait::async_trait;
use meridian_core::{Executor, GraphQLRequest, GraphQLResponse, GraphQLSchema};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct StubSchema {
    federated: bool,
}

#[async_trait]
impl Executor for StubSchema {
    async fn execute(&self, _request: &GraphQLRequest) -> GraphQLResponse {
        GraphQLResponse::default()
    }
}

impl GraphQLSchema for StubSchema {
    fn sdl(&self) -> String {
        "type Query { hello: String }".to_string()
    }

    fn is_federated(&self) -> bool {
        self.federated
    }
}

pub(crate) fn empty_schema() -> Arc<dyn GraphQLSchema> {
    Arc::new(StubSchema { federated: false })
}

pub(crate) fn federated_schema() -> Arc<dyn GraphQLSchema> {
    Arc::new(StubSchema { federated: true })
}
