use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tonic::Code;
use tonic_types::StatusExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDetail {
    pub field: String,
    pub message: String,
}

/// JSON error envelope: one human-readable sentence, the request id for
/// support triage, and per-field details for validation failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldDetail>,
}

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: String,
    pub details: Vec<FieldDetail>,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>, request_id: String) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            request_id,
            details: Vec::new(),
        }
    }

    pub fn internal(msg: impl Into<String>, request_id: String) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
            request_id,
            details: Vec::new(),
        }
    }

    /// Translate the gRPC outcome of the proxied call.
    pub fn from_rpc(status: tonic::Status, request_id: String) -> Self {
        let details = status
            .get_details_bad_request()
            .map(|bad_request| {
                bad_request
                    .field_violations
                    .into_iter()
                    .map(|v| FieldDetail {
                        field: v.field,
                        message: v.description,
                    })
                    .collect()
            })
            .unwrap_or_default();
        ApiError {
            status: http_status(status.code()),
            message: status.message().to_string(),
            request_id,
            details,
        }
    }
}

/// gRPC code → HTTP status, per the transport error table. 499 is the
/// de-facto "client closed request" status.
fn http_status(code: Code) -> StatusCode {
    match code {
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::FailedPrecondition | Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            request_id: self.request_id,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}
