use std::time::Instant;

/// Explicit request scope handed down from the transport pipeline:
/// correlation id for logs plus the enforcement deadline. Cancellation
/// itself is structural (dropping the request future aborts any
/// in-flight IO), so the context only needs to carry what outlives a
/// poll: identity and deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, deadline: Option<Instant>) -> Self {
        RequestContext {
            request_id: request_id.into(),
            deadline,
        }
    }

    /// A context with no deadline, for tests and internal callers.
    pub fn background() -> Self {
        RequestContext {
            request_id: String::new(),
            deadline: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
