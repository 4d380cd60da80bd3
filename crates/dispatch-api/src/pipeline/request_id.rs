use tonic::metadata::MetadataMap;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The inbound `x-request-id` if present and non-empty, else a fresh
/// UUIDv4. The resolved id is echoed on the response and stamped on
/// every log record for the request.
pub fn resolve(metadata: &MetadataMap) -> String {
    metadata
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
