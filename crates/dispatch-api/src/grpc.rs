//! gRPC projection of the use-case surface. Wire parsing and error
//! mapping live here; everything else is the shared service.

use std::sync::Arc;

use tonic::{Code, Request, Response, Status};
use tonic_types::{ErrorDetails, StatusExt};

use dispatch_core::{
    AssignDriverInput, AssignmentService, CreateAssignmentInput, GetMetricsInput,
    ListAssignmentsInput, ServiceError, UpdateStatusInput,
};
use dispatch_proto::convert;
use dispatch_proto::pb;
use pb::delivery_service_server::DeliveryService;

use crate::pipeline::RpcPipeline;

pub struct DeliveryGrpc {
    service: Arc<AssignmentService>,
    pipeline: RpcPipeline,
}

impl DeliveryGrpc {
    pub fn new(service: Arc<AssignmentService>, pipeline: RpcPipeline) -> Self {
        DeliveryGrpc { service, pipeline }
    }
}

/// Map the semantic error taxonomy onto gRPC codes. Validation failures
/// carry their per-field messages as standard BadRequest details so
/// clients can render them next to form fields.
pub fn status_from_service_error(err: ServiceError) -> Status {
    match err {
        ServiceError::InvalidInput(v) => {
            let mut details = ErrorDetails::new();
            for e in &v.errors {
                details.add_bad_request_violation(e.field.clone(), e.message.clone());
            }
            Status::with_error_details(Code::InvalidArgument, "validation failed", details)
        }
        ServiceError::NotFound(id) => Status::not_found(format!("assignment {id} not found")),
        ServiceError::InvalidTransition(e) => Status::failed_precondition(e.to_string()),
        ServiceError::AlreadyExists(what) => Status::already_exists(what),
        ServiceError::ConflictingWrite(id) => {
            Status::aborted(format!("concurrent modification of assignment {id}"))
        }
        ServiceError::DeadlineExceeded => Status::deadline_exceeded("request deadline exceeded"),
        ServiceError::Cancelled => Status::cancelled("request cancelled"),
        ServiceError::Internal(detail) => {
            // Detail stays in the logs; clients get the generic sentence.
            tracing::error!(error = %detail, "internal error");
            Status::internal("internal error")
        }
    }
}

fn delivery_response(assignment: &dispatch_domain::Assignment) -> pb::DeliveryResponse {
    pb::DeliveryResponse {
        delivery: Some(convert::delivery_to_proto(assignment)),
    }
}

#[tonic::async_trait]
impl DeliveryService for DeliveryGrpc {
    async fn create_delivery(
        &self,
        request: Request<pb::CreateDeliveryRequest>,
    ) -> Result<Response<pb::DeliveryResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("CreateDelivery", request, move |ctx, req| async move {
                let input = CreateAssignmentInput {
                    pickup_address: req
                        .pickup_address
                        .as_ref()
                        .map(convert::address_from_proto)
                        .unwrap_or_default(),
                    delivery_address: req
                        .delivery_address
                        .as_ref()
                        .map(convert::address_from_proto)
                        .unwrap_or_default(),
                    scheduled_pickup_time: convert::optional_datetime(
                        req.scheduled_pickup_time.as_ref(),
                    ),
                    estimated_delivery_time: convert::optional_datetime(
                        req.estimated_delivery_time.as_ref(),
                    ),
                    order_id: req.order_id,
                    notes: req.notes,
                };
                let assignment = service
                    .create_assignment(&ctx, input)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(delivery_response(&assignment))
            })
            .await
    }

    async fn get_delivery(
        &self,
        request: Request<pb::GetDeliveryRequest>,
    ) -> Result<Response<pb::DeliveryResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("GetDelivery", request, move |ctx, req| async move {
                let assignment = service
                    .get_assignment(&ctx, &req.id)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(delivery_response(&assignment))
            })
            .await
    }

    async fn update_delivery_status(
        &self,
        request: Request<pb::UpdateDeliveryStatusRequest>,
    ) -> Result<Response<pb::DeliveryResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("UpdateDeliveryStatus", request, move |ctx, req| async move {
                let input = UpdateStatusInput {
                    status: req.status().as_str_name().to_string(),
                    id: req.id,
                    notes: req.notes,
                };
                let assignment = service
                    .update_status(&ctx, input)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(delivery_response(&assignment))
            })
            .await
    }

    async fn assign_driver(
        &self,
        request: Request<pb::AssignDriverRequest>,
    ) -> Result<Response<pb::DeliveryResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("AssignDriver", request, move |ctx, req| async move {
                let input = AssignDriverInput {
                    id: req.id,
                    driver_id: req.driver_id,
                };
                let assignment = service
                    .assign_driver(&ctx, input)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(delivery_response(&assignment))
            })
            .await
    }

    async fn list_deliveries(
        &self,
        request: Request<pb::ListDeliveriesRequest>,
    ) -> Result<Response<pb::ListDeliveriesResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("ListDeliveries", request, move |ctx, req| async move {
                let status = match req.status() {
                    pb::DeliveryStatus::Unspecified => None,
                    s => Some(s.as_str_name().to_string()),
                };
                let input = ListAssignmentsInput {
                    page: req.page,
                    page_size: req.page_size,
                    status,
                    driver_id: Some(req.driver_id).filter(|d| !d.is_empty()),
                };
                let page = service
                    .list_assignments(&ctx, input)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(pb::ListDeliveriesResponse {
                    deliveries: page.items.iter().map(convert::delivery_to_proto).collect(),
                    total_count: page.total,
                    page: page.page,
                    page_size: page.page_size,
                })
            })
            .await
    }

    async fn get_delivery_metrics(
        &self,
        request: Request<pb::GetDeliveryMetricsRequest>,
    ) -> Result<Response<pb::GetDeliveryMetricsResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("GetDeliveryMetrics", request, move |ctx, req| async move {
                let input = GetMetricsInput {
                    start_time: convert::optional_datetime(req.start_time.as_ref()),
                    end_time: convert::optional_datetime(req.end_time.as_ref()),
                    driver_id: Some(req.driver_id).filter(|d| !d.is_empty()),
                };
                let m = service
                    .get_metrics(&ctx, input)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(pb::GetDeliveryMetricsResponse {
                    total: m.total,
                    completed: m.completed,
                    failed: m.failed,
                    cancelled: m.cancelled,
                    avg_delivery_minutes: m.avg_delivery_minutes,
                    on_time_rate: m.on_time_rate,
                })
            })
            .await
    }

    async fn delete_delivery(
        &self,
        request: Request<pb::DeleteDeliveryRequest>,
    ) -> Result<Response<pb::DeleteDeliveryResponse>, Status> {
        let service = self.service.clone();
        self.pipeline
            .run("DeleteDelivery", request, move |ctx, req| async move {
                service
                    .delete_assignment(&ctx, &req.id)
                    .await
                    .map_err(status_from_service_error)?;
                Ok(pb::DeleteDeliveryResponse {})
            })
            .await
    }
}
