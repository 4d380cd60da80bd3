use std::sync::Arc;

use chrono::{Duration, Utc};

use dispatch_core::{
    AssignDriverInput, AssignmentRepository, AssignmentService, CreateAssignmentInput,
    GetMetricsInput, ListAssignmentsInput, RequestContext, ServiceError, UpdateStatusInput,
};
use dispatch_domain::{Address, Assignment, DeliveryStatus};
use dispatch_store::InMemoryRepository;

fn address() -> Address {
    Address {
        street: "1 A".into(),
        city: "NYC".into(),
        state: "NY".into(),
        postal_code: "10001".into(),
        country: "USA".into(),
        latitude: 40.71,
        longitude: -74.0,
    }
}

fn create_input() -> CreateAssignmentInput {
    let now = Utc::now();
    CreateAssignmentInput {
        order_id: "ORDER-1".into(),
        pickup_address: address(),
        delivery_address: address(),
        scheduled_pickup_time: Some(now + Duration::hours(1)),
        estimated_delivery_time: Some(now + Duration::hours(3)),
        notes: String::new(),
    }
}

fn harness() -> (Arc<InMemoryRepository>, AssignmentService, RequestContext) {
    let repo = Arc::new(InMemoryRepository::new());
    let service = AssignmentService::new(repo.clone());
    (repo, service, RequestContext::background())
}

fn field_errors(err: ServiceError) -> Vec<String> {
    match err {
        ServiceError::InvalidInput(v) => v.errors.into_iter().map(|e| e.field).collect(),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

// ── Create ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_happy_path() {
    let (repo, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    assert_eq!(a.status(), DeliveryStatus::Pending);
    assert_eq!(a.order_id(), "ORDER-1");
    let stored = repo.get_by_id(a.id()).await.unwrap();
    assert_eq!(stored, a);
}

#[tokio::test]
async fn create_rejects_missing_order_and_addresses() {
    let (_, service, ctx) = harness();
    let mut input = create_input();
    input.order_id = "  ".into();
    input.pickup_address.city = String::new();
    let fields = field_errors(service.create_assignment(&ctx, input).await.unwrap_err());
    assert!(fields.contains(&"order_id".to_string()));
    assert!(fields.contains(&"pickup_address.city".to_string()));
}

#[tokio::test]
async fn create_pickup_lead_time_boundary() {
    let (_, service, ctx) = harness();

    // comfortably past the 30-minute minimum: passes
    let mut ok = create_input();
    ok.scheduled_pickup_time = Some(Utc::now() + Duration::minutes(31));
    ok.estimated_delivery_time = Some(Utc::now() + Duration::minutes(31 + 16));
    assert!(service.create_assignment(&ctx, ok).await.is_ok());

    // 29 minutes out: rejected
    let mut short = create_input();
    short.scheduled_pickup_time = Some(Utc::now() + Duration::minutes(29));
    short.estimated_delivery_time = Some(Utc::now() + Duration::hours(2));
    let fields = field_errors(service.create_assignment(&ctx, short).await.unwrap_err());
    assert_eq!(fields, vec!["scheduled_pickup_time".to_string()]);
}

#[tokio::test]
async fn create_rejects_pickup_beyond_horizon() {
    let (_, service, ctx) = harness();
    let mut input = create_input();
    input.scheduled_pickup_time = Some(Utc::now() + Duration::days(31));
    input.estimated_delivery_time = Some(Utc::now() + Duration::days(31) + Duration::hours(1));
    let fields = field_errors(service.create_assignment(&ctx, input).await.unwrap_err());
    assert_eq!(fields, vec!["scheduled_pickup_time".to_string()]);
}

#[tokio::test]
async fn create_delivery_window_boundary() {
    let (_, service, ctx) = harness();
    let pickup = Utc::now() + Duration::hours(1);

    // exactly 15 minutes after pickup: passes
    let mut ok = create_input();
    ok.scheduled_pickup_time = Some(pickup);
    ok.estimated_delivery_time = Some(pickup + Duration::minutes(15));
    assert!(service.create_assignment(&ctx, ok).await.is_ok());

    // 14 minutes: rejected
    let mut short = create_input();
    short.scheduled_pickup_time = Some(pickup);
    short.estimated_delivery_time = Some(pickup + Duration::minutes(14));
    let fields = field_errors(service.create_assignment(&ctx, short).await.unwrap_err());
    assert_eq!(fields, vec!["estimated_delivery_time".to_string()]);
}

#[tokio::test]
async fn create_requires_both_timestamps() {
    let (_, service, ctx) = harness();
    let mut input = create_input();
    input.scheduled_pickup_time = None;
    input.estimated_delivery_time = None;
    let fields = field_errors(service.create_assignment(&ctx, input).await.unwrap_err());
    assert!(fields.contains(&"scheduled_pickup_time".to_string()));
    assert!(fields.contains(&"estimated_delivery_time".to_string()));
}

// ── Get / delete ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_rejects_malformed_id() {
    let (_, service, ctx) = harness();
    let fields = field_errors(service.get_assignment(&ctx, "not-a-uuid").await.unwrap_err());
    assert_eq!(fields, vec!["id".to_string()]);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let (_, service, ctx) = harness();
    let err = service
        .get_assignment(&ctx, "00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let id = a.id().to_string();
    service.delete_assignment(&ctx, &id).await.unwrap();
    let err = service.get_assignment(&ctx, &id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// ── Status updates ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_to_delivered() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let id = a.id().to_string();

    let assigned = service
        .assign_driver(
            &ctx,
            AssignDriverInput {
                id: id.clone(),
                driver_id: "DRIVER-1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(assigned.status(), DeliveryStatus::Assigned);
    assert_eq!(assigned.driver_id(), Some("DRIVER-1"));

    for status in ["PICKED_UP", "IN_TRANSIT", "DELIVERED"] {
        service
            .update_status(
                &ctx,
                UpdateStatusInput {
                    id: id.clone(),
                    status: status.into(),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    let done = service.get_assignment(&ctx, &id).await.unwrap();
    assert_eq!(done.status(), DeliveryStatus::Delivered);
    assert!(done.actual_pickup_time().is_some());
    assert!(done.actual_delivery_time().is_some());
    assert!(done.actual_delivery_time() >= done.actual_pickup_time());
}

#[tokio::test]
async fn update_status_accepts_prefixed_names() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let updated = service
        .update_status(
            &ctx,
            UpdateStatusInput {
                id: a.id().to_string(),
                status: "DELIVERY_STATUS_CANCELLED".into(),
                notes: Some("customer cancelled".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status(), DeliveryStatus::Cancelled);
    assert_eq!(updated.notes(), "customer cancelled");
}

#[tokio::test]
async fn forbidden_transition_is_surfaced_and_state_unchanged() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let err = service
        .update_status(
            &ctx,
            UpdateStatusInput {
                id: a.id().to_string(),
                status: "DELIVERED".into(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let unchanged = service
        .get_assignment(&ctx, &a.id().to_string())
        .await
        .unwrap();
    assert_eq!(unchanged.status(), DeliveryStatus::Pending);
}

#[tokio::test]
async fn update_status_rejects_unknown_status() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let fields = field_errors(
        service
            .update_status(
                &ctx,
                UpdateStatusInput {
                    id: a.id().to_string(),
                    status: "SHIPPED".into(),
                    notes: None,
                },
            )
            .await
            .unwrap_err(),
    );
    assert_eq!(fields, vec!["status".to_string()]);
}

#[tokio::test]
async fn assign_driver_requires_driver_id() {
    let (_, service, ctx) = harness();
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let fields = field_errors(
        service
            .assign_driver(
                &ctx,
                AssignDriverInput {
                    id: a.id().to_string(),
                    driver_id: "".into(),
                },
            )
            .await
            .unwrap_err(),
    );
    assert!(fields.contains(&"driver_id".to_string()));
}

#[tokio::test]
async fn racing_driver_assignments_exactly_one_wins() {
    let (_, service, ctx) = harness();
    let service = Arc::new(service);
    let a = service.create_assignment(&ctx, create_input()).await.unwrap();
    let id = a.id().to_string();

    let mut tasks = Vec::new();
    for driver in ["DRIVER-1", "DRIVER-2"] {
        let service = service.clone();
        let ctx = ctx.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            service
                .assign_driver(
                    &ctx,
                    AssignDriverInput {
                        id,
                        driver_id: driver.into(),
                    },
                )
                .await
        }));
    }
    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }

    // Exactly one writer wins; the loser re-checks against fresh state
    // and reports an invalid transition, never a stale commit.
    let winners = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| matches!(e, ServiceError::InvalidTransition(_))));

    let final_state = service.get_assignment(&ctx, &id).await.unwrap();
    assert_eq!(final_state.status(), DeliveryStatus::Assigned);
    let winning_driver = outcomes
        .iter()
        .find_map(|o| o.as_ref().ok())
        .unwrap()
        .driver_id()
        .unwrap()
        .to_string();
    assert_eq!(final_state.driver_id(), Some(winning_driver.as_str()));
}

// ── Listing ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_normalises_paging() {
    let (_, service, ctx) = harness();
    for _ in 0..3 {
        service.create_assignment(&ctx, create_input()).await.unwrap();
    }

    // page 0 -> 1, page_size 0 -> 20
    let page = service
        .list_assignments(
            &ctx,
            ListAssignmentsInput {
                page: 0,
                page_size: 0,
                status: None,
                driver_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 20);

    // page_size 101 -> 20 as well
    let oversized = service
        .list_assignments(
            &ctx,
            ListAssignmentsInput {
                page: 1,
                page_size: 101,
                status: None,
                driver_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(oversized.items.len(), 3);
}

#[tokio::test]
async fn list_pages_and_filters_by_status() {
    let (_, service, ctx) = harness();
    for _ in 0..25 {
        service.create_assignment(&ctx, create_input()).await.unwrap();
    }
    let page = service
        .list_assignments(
            &ctx,
            ListAssignmentsInput {
                page: 2,
                page_size: 10,
                status: Some("PENDING".into()),
                driver_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 10);
}

#[tokio::test]
async fn list_rejects_unknown_status_filter() {
    let (_, service, ctx) = harness();
    let fields = field_errors(
        service
            .list_assignments(
                &ctx,
                ListAssignmentsInput {
                    page: 1,
                    page_size: 10,
                    status: Some("SHIPPED".into()),
                    driver_id: None,
                },
            )
            .await
            .unwrap_err(),
    );
    assert_eq!(fields, vec!["status".to_string()]);
}

// ── Metrics ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_window_validation() {
    let (_, service, ctx) = harness();
    let now = Utc::now();

    let err = service
        .get_metrics(
            &ctx,
            GetMetricsInput {
                start_time: Some(now),
                end_time: Some(now - Duration::hours(1)),
                driver_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = service
        .get_metrics(
            &ctx,
            GetMetricsInput {
                start_time: None,
                end_time: Some(now),
                driver_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn metrics_aggregates_seeded_window() {
    let (repo, service, ctx) = harness();
    let now = Utc::now();

    // one on-time delivery (120 min), one late (180 min), one failed
    for (minutes, late, failed) in [(120i64, false, false), (180, true, false), (0, false, true)] {
        let mut rec = Assignment::new(
            "ORDER-M",
            address(),
            address(),
            now + Duration::hours(1),
            now + Duration::hours(3),
            "",
        )
        .to_record();
        if failed {
            rec.status = DeliveryStatus::Failed;
        } else {
            rec.status = DeliveryStatus::Delivered;
            let pickup = now - Duration::hours(5);
            let delivered = pickup + Duration::minutes(minutes);
            rec.actual_pickup_time = Some(pickup);
            rec.actual_delivery_time = Some(delivered);
            rec.estimated_delivery_time = if late {
                delivered - Duration::minutes(1)
            } else {
                delivered + Duration::minutes(1)
            };
        }
        repo.create(&Assignment::from_record(rec)).await.unwrap();
    }

    let m = service
        .get_metrics(
            &ctx,
            GetMetricsInput {
                start_time: Some(now - Duration::hours(1)),
                end_time: Some(now + Duration::hours(1)),
                driver_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(m.total, 3);
    assert_eq!(m.completed, 2);
    assert_eq!(m.failed, 1);
    assert_eq!(m.cancelled, 0);
    assert!((m.avg_delivery_minutes - 150.0).abs() < 0.01);
    assert!((m.on_time_rate - 0.5).abs() < f64::EPSILON);
}

// ── Deadlines ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn expired_context_short_circuits() {
    let (_, service, _) = harness();
    let expired = RequestContext::new("req-1", Some(std::time::Instant::now()));
    let err = service
        .create_assignment(&expired, create_input())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DeadlineExceeded));
}
