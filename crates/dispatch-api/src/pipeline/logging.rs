use std::time::Duration;

use tonic::{Code, Status};
use tracing::{error, info};

use super::metrics::code_label;

/// One structured record per request on exit. Transport-level failures
/// log at ERROR; everything else at INFO.
pub fn emit(
    method: &str,
    code: Code,
    elapsed: Duration,
    request_id: &str,
    failure: Option<&Status>,
) {
    let elapsed_ms = elapsed.as_millis() as u64;
    let code = code_label(code);
    match failure {
        None => info!(method, code, elapsed_ms, request_id, "rpc completed"),
        Some(status) => {
            // Messages carry only what the client saw; internals were
            // logged where the error originated.
            error!(
                method,
                code,
                elapsed_ms,
                request_id,
                error = %status.message(),
                "rpc failed"
            );
        }
    }
}
