//! REST/JSON gateway. Each handler re-encodes the call as a gRPC call
//! to the local RPC server, so business logic, deadlines, and request
//! metrics live in exactly one place. Only HTTP-specific concerns
//! (paths, query binding, request-id header, per-status log levels)
//! happen here.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::routing::{get, patch, post};
use axum::Router;
use tonic::transport::Channel;

use dispatch_proto::pb::delivery_service_client::DeliveryServiceClient;

#[derive(Clone)]
pub struct GatewayState {
    pub client: DeliveryServiceClient<Channel>,
}

pub fn router(client: DeliveryServiceClient<Channel>) -> Router {
    let state = GatewayState { client };
    Router::new()
        .route(
            "/v1/deliveries",
            post(handlers::create_delivery).get(handlers::list_deliveries),
        )
        .route("/v1/deliveries/metrics", get(handlers::get_metrics))
        .route(
            "/v1/deliveries/:id",
            get(handlers::get_delivery).delete(handlers::delete_delivery),
        )
        .route("/v1/deliveries/:id/status", patch(handlers::update_status))
        .route(
            "/v1/deliveries/:id/assign-driver",
            post(handlers::assign_driver),
        )
        .layer(axum::middleware::from_fn(middleware::observe_request))
        .with_state(state)
}
