use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tonic::metadata::MetadataValue;

use dispatch_proto::convert;
use dispatch_proto::pb;

use super::dto::{
    AssignDriverBody, CreateDeliveryBody, DeliveryBody, ListDeliveriesBody, ListQuery,
    MetricsBody, MetricsQuery, UpdateStatusBody,
};
use super::error::ApiError;
use super::middleware::request_id;
use super::GatewayState;

/// Wrap a message for the local RPC hop, forwarding the request id so
/// the RPC pipeline logs and echoes the same correlation id.
fn rpc_request<T>(message: T, request_id: &str) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    if let Ok(value) = MetadataValue::try_from(request_id) {
        request.metadata_mut().insert("x-request-id", value);
    }
    request
}

fn delivery_body(
    response: pb::DeliveryResponse,
    request_id: &str,
) -> Result<Json<DeliveryBody>, ApiError> {
    let delivery = response.delivery.ok_or_else(|| {
        ApiError::internal("delivery payload missing", request_id.to_string())
    })?;
    Ok(Json(DeliveryBody::from_proto(&delivery, request_id)?))
}

pub async fn create_delivery(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<CreateDeliveryBody>,
) -> Result<Json<DeliveryBody>, ApiError> {
    let rid = request_id(&headers);
    let message = pb::CreateDeliveryRequest {
        order_id: body.order_id,
        pickup_address: Some(body.pickup_address.into_proto()),
        delivery_address: Some(body.delivery_address.into_proto()),
        scheduled_pickup_time: body.scheduled_pickup_time.map(convert::timestamp),
        estimated_delivery_time: body.estimated_delivery_time.map(convert::timestamp),
        notes: body.notes,
    };
    let mut client = state.client.clone();
    let response = client
        .create_delivery(rpc_request(message, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();
    delivery_body(response, &rid)
}

pub async fn get_delivery(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeliveryBody>, ApiError> {
    let rid = request_id(&headers);
    let mut client = state.client.clone();
    let response = client
        .get_delivery(rpc_request(pb::GetDeliveryRequest { id }, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();
    delivery_body(response, &rid)
}

pub async fn update_status(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<DeliveryBody>, ApiError> {
    let rid = request_id(&headers);
    let status = convert::status_from_wire_name(&body.status).ok_or_else(|| {
        ApiError::bad_request(format!("unknown status '{}'", body.status), rid.clone())
    })?;
    let message = pb::UpdateDeliveryStatusRequest {
        id,
        status: status.into(),
        notes: body.notes,
    };
    let mut client = state.client.clone();
    let response = client
        .update_delivery_status(rpc_request(message, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();
    delivery_body(response, &rid)
}

pub async fn assign_driver(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignDriverBody>,
) -> Result<Json<DeliveryBody>, ApiError> {
    let rid = request_id(&headers);
    let message = pb::AssignDriverRequest {
        id,
        driver_id: body.driver_id,
    };
    let mut client = state.client.clone();
    let response = client
        .assign_driver(rpc_request(message, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();
    delivery_body(response, &rid)
}

pub async fn list_deliveries(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListDeliveriesBody>, ApiError> {
    let rid = request_id(&headers);
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        None => pb::DeliveryStatus::Unspecified,
        Some(name) => convert::status_from_wire_name(name).ok_or_else(|| {
            ApiError::bad_request(format!("unknown status '{name}'"), rid.clone())
        })?,
    };
    let message = pb::ListDeliveriesRequest {
        page: query.page.unwrap_or(0),
        page_size: query.page_size.unwrap_or(0),
        status: status.into(),
        driver_id: query.driver_id.unwrap_or_default(),
    };
    let mut client = state.client.clone();
    let response = client
        .list_deliveries(rpc_request(message, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();

    let deliveries = response
        .deliveries
        .iter()
        .map(|d| DeliveryBody::from_proto(d, &rid))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(ListDeliveriesBody {
        deliveries,
        total_count: response.total_count,
        page: response.page,
        page_size: response.page_size,
    }))
}

pub async fn get_metrics(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsBody>, ApiError> {
    let rid = request_id(&headers);
    let message = pb::GetDeliveryMetricsRequest {
        start_time: query.start_time.map(convert::timestamp),
        end_time: query.end_time.map(convert::timestamp),
        driver_id: query.driver_id.unwrap_or_default(),
    };
    let mut client = state.client.clone();
    let m = client
        .get_delivery_metrics(rpc_request(message, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid.clone()))?
        .into_inner();
    Ok(Json(MetricsBody {
        total: m.total,
        completed: m.completed,
        failed: m.failed,
        cancelled: m.cancelled,
        avg_delivery_minutes: m.avg_delivery_minutes,
        on_time_rate: m.on_time_rate,
    }))
}

pub async fn delete_delivery(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = request_id(&headers);
    let mut client = state.client.clone();
    client
        .delete_delivery(rpc_request(pb::DeleteDeliveryRequest { id }, &rid))
        .await
        .map_err(|s| ApiError::from_rpc(s, rid))?;
    Ok(StatusCode::NO_CONTENT)
}
