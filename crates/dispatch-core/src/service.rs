use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use dispatch_domain::{Address, Assignment, DeliveryStatus, Validator};

use crate::context::RequestContext;
use crate::error::ServiceError;
use crate::repository::{
    AssignmentRepository, DeliveryMetrics, ListFilters, ListPage, MetricsWindow,
};

/// Minimum lead time between "now" and the scheduled pickup, minutes.
const MIN_PICKUP_LEAD_MINUTES: i64 = 30;
/// Maximum scheduling horizon, days.
const MAX_PICKUP_HORIZON_DAYS: i64 = 30;
/// Minimum pickup-to-delivery window, minutes.
const MIN_DELIVERY_WINDOW_MINUTES: i64 = 15;

/// Attempts for the optimistic read-modify-write loop. Each retry
/// re-checks the transition against freshly loaded state, so a stale
/// view is never committed.
const MAX_WRITE_ATTEMPTS: u32 = 3;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

// ── Inputs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateAssignmentInput {
    pub order_id: String,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct UpdateStatusInput {
    pub id: String,
    /// Wire name; both `PENDING` and `DELIVERY_STATUS_PENDING` accepted.
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssignDriverInput {
    pub id: String,
    pub driver_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListAssignmentsInput {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<String>,
    pub driver_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetMetricsInput {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub driver_id: Option<String>,
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Orchestrates validation, entity construction/mutation and repository
/// calls. Stateless and re-entrant; all state is request-scoped.
pub struct AssignmentService {
    repo: Arc<dyn AssignmentRepository>,
}

impl AssignmentService {
    pub fn new(repo: Arc<dyn AssignmentRepository>) -> Self {
        AssignmentService { repo }
    }

    pub async fn create_assignment(
        &self,
        ctx: &RequestContext,
        input: CreateAssignmentInput,
    ) -> Result<Assignment, ServiceError> {
        self.check_deadline(ctx)?;

        let now = Utc::now();
        let mut v = Validator::new();
        v.required("order_id", &input.order_id)
            .length("order_id", &input.order_id, 1, 100)
            .address("pickup_address", &input.pickup_address)
            .address("delivery_address", &input.delivery_address)
            .time_set("scheduled_pickup_time", input.scheduled_pickup_time)
            .time_set("estimated_delivery_time", input.estimated_delivery_time);
        if let Some(pickup) = input.scheduled_pickup_time {
            v.time_at_or_after(
                "scheduled_pickup_time",
                pickup,
                now + Duration::minutes(MIN_PICKUP_LEAD_MINUTES),
                "at least 30 minutes in the future",
            )
            .time_at_or_before(
                "scheduled_pickup_time",
                pickup,
                now + Duration::days(MAX_PICKUP_HORIZON_DAYS),
                "within 30 days",
            );
            if let Some(delivery) = input.estimated_delivery_time {
                v.time_at_or_after(
                    "estimated_delivery_time",
                    delivery,
                    pickup + Duration::minutes(MIN_DELIVERY_WINDOW_MINUTES),
                    "at least 15 minutes after the scheduled pickup",
                );
            }
        }
        v.finish()?;

        // time_set above guarantees both are present
        let assignment = Assignment::new(
            input.order_id,
            input.pickup_address,
            input.delivery_address,
            input
                .scheduled_pickup_time
                .ok_or_else(|| ServiceError::internal("scheduled_pickup_time vanished"))?,
            input
                .estimated_delivery_time
                .ok_or_else(|| ServiceError::internal("estimated_delivery_time vanished"))?,
            input.notes,
        );
        self.repo.create(&assignment).await?;
        debug!(request_id = %ctx.request_id(), id = %assignment.id(), "assignment created");
        Ok(assignment)
    }

    pub async fn get_assignment(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Assignment, ServiceError> {
        self.check_deadline(ctx)?;
        let id = parse_id(id)?;
        self.repo.get_by_id(id).await
    }

    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        input: UpdateStatusInput,
    ) -> Result<Assignment, ServiceError> {
        self.check_deadline(ctx)?;

        let mut v = Validator::new();
        v.uuid("id", &input.id);
        let next = DeliveryStatus::parse(&input.status);
        if next.is_none() {
            v.one_of("status", &input.status, &STATUS_NAMES);
        }
        v.finish()?;
        let id = parse_id(&input.id)?;
        let next = next.ok_or_else(|| ServiceError::internal("status vanished"))?;

        // Optimistic read-modify-write: the conditional update loses to a
        // concurrent writer, in which case we reload and re-run the
        // transition check against the fresh state.
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut assignment = self.repo.get_by_id(id).await?;
            let seen = assignment.updated_at();
            assignment.update_status(next, input.notes.clone())?;
            match self.repo.update(&assignment, seen).await {
                Ok(()) => return Ok(assignment),
                Err(ServiceError::ConflictingWrite(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::ConflictingWrite(id))
    }

    pub async fn assign_driver(
        &self,
        ctx: &RequestContext,
        input: AssignDriverInput,
    ) -> Result<Assignment, ServiceError> {
        self.check_deadline(ctx)?;

        let mut v = Validator::new();
        v.uuid("id", &input.id)
            .required("driver_id", &input.driver_id)
            .length("driver_id", &input.driver_id, 1, 100);
        v.finish()?;
        let id = parse_id(&input.id)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut assignment = self.repo.get_by_id(id).await?;
            let seen = assignment.updated_at();
            assignment.assign_driver(input.driver_id.clone())?;
            match self.repo.update(&assignment, seen).await {
                Ok(()) => return Ok(assignment),
                Err(ServiceError::ConflictingWrite(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::ConflictingWrite(id))
    }

    pub async fn list_assignments(
        &self,
        ctx: &RequestContext,
        input: ListAssignmentsInput,
    ) -> Result<ListPage, ServiceError> {
        self.check_deadline(ctx)?;

        let status = match &input.status {
            Some(s) if !s.is_empty() => {
                let mut v = Validator::new();
                let parsed = DeliveryStatus::parse(s);
                if parsed.is_none() {
                    v.one_of("status", s, &STATUS_NAMES);
                }
                v.finish()?;
                parsed
            }
            _ => None,
        };

        let filters = ListFilters {
            page: input.page.max(1),
            page_size: normalise_page_size(input.page_size),
            status,
            driver_id: input.driver_id.filter(|d| !d.is_empty()),
        };
        self.repo.list(&filters).await
    }

    pub async fn get_metrics(
        &self,
        ctx: &RequestContext,
        input: GetMetricsInput,
    ) -> Result<DeliveryMetrics, ServiceError> {
        self.check_deadline(ctx)?;

        let mut v = Validator::new();
        v.time_set("start_time", input.start_time)
            .time_set("end_time", input.end_time);
        if let (Some(start), Some(end)) = (input.start_time, input.end_time) {
            v.time_at_or_before("start_time", start, end, "before end_time");
        }
        v.finish()?;

        let window = MetricsWindow {
            start: input
                .start_time
                .ok_or_else(|| ServiceError::internal("start_time vanished"))?,
            end: input
                .end_time
                .ok_or_else(|| ServiceError::internal("end_time vanished"))?,
            driver_id: input.driver_id.filter(|d| !d.is_empty()),
        };
        self.repo.metrics(&window).await
    }

    pub async fn delete_assignment(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<(), ServiceError> {
        self.check_deadline(ctx)?;
        let id = parse_id(id)?;
        self.repo.delete(id).await
    }

    fn check_deadline(&self, ctx: &RequestContext) -> Result<(), ServiceError> {
        if ctx.deadline_expired() {
            return Err(ServiceError::DeadlineExceeded);
        }
        Ok(())
    }
}

const STATUS_NAMES: [&str; 7] = [
    "PENDING",
    "ASSIGNED",
    "PICKED_UP",
    "IN_TRANSIT",
    "DELIVERED",
    "FAILED",
    "CANCELLED",
];

fn parse_id(id: &str) -> Result<Uuid, ServiceError> {
    let mut v = Validator::new();
    v.uuid("id", id);
    v.finish()?;
    Uuid::parse_str(id).map_err(|e| ServiceError::internal(format!("uuid re-parse: {e}")))
}

fn normalise_page_size(page_size: u32) -> u32 {
    if (1..=MAX_PAGE_SIZE).contains(&page_size) {
        page_size
    } else {
        DEFAULT_PAGE_SIZE
    }
}
