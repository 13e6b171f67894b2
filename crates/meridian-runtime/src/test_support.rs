use async_trait::async_trait;
use meridian_core::{Executor, GraphQLRequest, GraphQLResponse, GraphQLSchema};

#[derive(Debug)]
pub(crate) struct StubSchema;

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
}
