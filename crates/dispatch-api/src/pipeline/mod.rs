//! Per-request pipeline applied to every RPC, in fixed order:
//! request-id, deadline, metrics, logging. Later stages depend on
//! context state established by earlier ones, so the order is part of
//! the contract.

pub mod deadline;
pub mod logging;
pub mod metrics;
pub mod request_id;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tonic::metadata::MetadataValue;
use tonic::{Code, Request, Response, Status};

use dispatch_core::RequestContext;

use metrics::ApiMetrics;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

pub struct RpcPipeline {
    metrics: Arc<ApiMetrics>,
    default_deadline: Duration,
}

impl RpcPipeline {
    pub fn new(metrics: Arc<ApiMetrics>) -> Self {
        Self::with_deadline(metrics, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(metrics: Arc<ApiMetrics>, default_deadline: Duration) -> Self {
        RpcPipeline {
            metrics,
            default_deadline,
        }
    }

    /// Wrap one unary handler invocation.
    ///
    /// The in-flight gauge is held by an RAII guard so it decrements
    /// exactly once on every exit path, including timeouts and panics.
    pub async fn run<Req, Res, F, Fut>(
        &self,
        method: &'static str,
        request: Request<Req>,
        handler: F,
    ) -> Result<Response<Res>, Status>
    where
        F: FnOnce(RequestContext, Req) -> Fut,
        Fut: Future<Output = Result<Res, Status>>,
    {
        let request_id = request_id::resolve(request.metadata());
        let timeout = deadline::resolve(request.metadata()).unwrap_or(self.default_deadline);
        let ctx = RequestContext::new(request_id.clone(), Some(Instant::now() + timeout));

        let _in_flight = self.metrics.track_in_flight(method);
        let started = Instant::now();

        let outcome =
            match tokio::time::timeout(timeout, handler(ctx, request.into_inner())).await {
                Ok(result) => result,
                Err(_) => Err(Status::deadline_exceeded("request deadline exceeded")),
            };

        let elapsed = started.elapsed();
        let code = match &outcome {
            Ok(_) => Code::Ok,
            Err(status) => status.code(),
        };
        self.metrics.observe(method, code, elapsed);
        logging::emit(method, code, elapsed, &request_id, outcome.as_ref().err());

        match outcome {
            Ok(payload) => {
                let mut response = Response::new(payload);
                if let Ok(value) = MetadataValue::try_from(request_id.as_str()) {
                    response
                        .metadata_mut()
                        .insert(request_id::REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            Err(mut status) => {
                if let Ok(value) = MetadataValue::try_from(request_id.as_str()) {
                    status
                        .metadata_mut()
                        .insert(request_id::REQUEST_ID_HEADER, value);
                }
                Err(status)
            }
        }
    }
}
