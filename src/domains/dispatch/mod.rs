//! Request dispatch.
//!
//! The router answers catalog queries and resolves tool names against the
//! current snapshot; the executor runs resolved calls. [`Dispatcher`] ties
//! both to the validator for use by a connection.

mod executor;
mod router;

pub use executor::{MAX_ERROR_MESSAGE_CHARS, ToolExecutor, sanitize};
pub use router::{Execution, Routed, Router};

use crate::domains::protocol::{Message, validate};

/// Validate, route and execute requests for one server.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Router,
    executor: ToolExecutor,
}

impl Dispatcher {
    pub fn new(router: Router, executor: ToolExecutor) -> Self {
        Self { router, executor }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one raw frame. Validation failures come back as a reply.
    pub fn accept(&self, raw: &str) -> Routed {
        match validate(raw) {
            Ok(request) => self.router.route(request),
            Err(rejection) => Routed::Reply(rejection),
        }
    }

    /// Run a resolved call to its single response.
    pub async fn execute(&self, execution: Execution) -> Message {
        self.executor.execute(execution).await
    }
}
