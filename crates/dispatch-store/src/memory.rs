use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use dispatch_core::{
    AssignmentRepository, DeliveryMetrics, ListFilters, ListPage, MetricsWindow, ServiceError,
    TxWork,
};
use dispatch_domain::{Assignment, DeliveryStatus};

#[derive(Debug, Clone, Default)]
struct Inner {
    assignments: HashMap<Uuid, Assignment>,
}

/// In-memory implementation of [`AssignmentRepository`].
///
/// All data is lost on process exit. Backs tests and ephemeral runs;
/// mirrors the Postgres adapter's semantics, including the optimistic
/// `updated_at` guard and soft-delete visibility.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn live(a: &Assignment) -> bool {
    !a.is_deleted()
}

fn matches(a: &Assignment, filters: &ListFilters) -> bool {
    if let Some(status) = filters.status {
        if a.status() != status {
            return false;
        }
    }
    if let Some(driver) = &filters.driver_id {
        if a.driver_id() != Some(driver.as_str()) {
            return false;
        }
    }
    true
}

fn in_window(a: &Assignment, window: &MetricsWindow) -> bool {
    if a.created_at() < window.start || a.created_at() > window.end {
        return false;
    }
    if let Some(driver) = &window.driver_id {
        if a.driver_id() != Some(driver.as_str()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn create(&self, assignment: &Assignment) -> Result<(), ServiceError> {
        let mut guard = self.inner.write().await;
        if guard.assignments.contains_key(&assignment.id()) {
            return Err(ServiceError::internal(format!(
                "duplicate assignment id {}",
                assignment.id()
            )));
        }
        guard.assignments.insert(assignment.id(), assignment.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Assignment, ServiceError> {
        let guard = self.inner.read().await;
        guard
            .assignments
            .get(&id)
            .filter(|a| live(a))
            .cloned()
            .ok_or(ServiceError::NotFound(id))
    }

    async fn update(
        &self,
        assignment: &Assignment,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut guard = self.inner.write().await;
        let stored = guard
            .assignments
            .get(&assignment.id())
            .filter(|a| live(a))
            .ok_or(ServiceError::NotFound(assignment.id()))?;
        if stored.updated_at() != expected_updated_at {
            return Err(ServiceError::ConflictingWrite(assignment.id()));
        }
        guard.assignments.insert(assignment.id(), assignment.clone());
        Ok(())
    }

    async fn list(&self, filters: &ListFilters) -> Result<ListPage, ServiceError> {
        let guard = self.inner.read().await;
        let mut matching: Vec<&Assignment> = guard
            .assignments
            .values()
            .filter(|a| live(a) && matches(a, filters))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filters.offset() as usize)
            .take(filters.page_size as usize)
            .cloned()
            .collect();
        Ok(ListPage {
            items,
            total,
            page: filters.page,
            page_size: filters.page_size,
        })
    }

    async fn metrics(&self, window: &MetricsWindow) -> Result<DeliveryMetrics, ServiceError> {
        let guard = self.inner.read().await;
        let rows: Vec<&Assignment> = guard
            .assignments
            .values()
            .filter(|a| live(a) && in_window(a, window))
            .collect();

        let mut m = DeliveryMetrics {
            total: rows.len() as u64,
            ..Default::default()
        };

        let mut durations_min = Vec::new();
        let mut delivered = 0u64;
        let mut on_time = 0u64;
        for a in rows {
            match a.status() {
                DeliveryStatus::Delivered => {
                    m.completed += 1;
                    delivered += 1;
                    if let (Some(pickup), Some(delivery)) =
                        (a.actual_pickup_time(), a.actual_delivery_time())
                    {
                        durations_min.push((delivery - pickup).num_seconds() as f64 / 60.0);
                    }
                    if a.actual_delivery_time()
                        .is_some_and(|t| t <= a.estimated_delivery_time())
                    {
                        on_time += 1;
                    }
                }
                DeliveryStatus::Failed => m.failed += 1,
                DeliveryStatus::Cancelled => m.cancelled += 1,
                _ => {}
            }
        }
        if !durations_min.is_empty() {
            m.avg_delivery_minutes =
                durations_min.iter().sum::<f64>() / durations_min.len() as f64;
        }
        if delivered > 0 {
            m.on_time_rate = on_time as f64 / delivered as f64;
        }
        Ok(m)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut guard = self.inner.write().await;
        let stored = guard
            .assignments
            .get_mut(&id)
            .filter(|a| live(a))
            .ok_or(ServiceError::NotFound(id))?;
        stored.mark_deleted();
        Ok(())
    }

    /// Snapshot-rollback transactionality: the whole map is cloned up
    /// front and restored if `work` fails. Atomic with respect to other
    /// callers only for the duration of each individual operation, which
    /// is all the tests that use it require.
    async fn with_transaction<'a>(&'a self, work: TxWork<'a>) -> Result<(), ServiceError> {
        let snapshot = self.inner.read().await.clone();
        let result = work(self).await;
        if result.is_err() {
            *self.inner.write().await = snapshot;
        }
        result
    }
}
