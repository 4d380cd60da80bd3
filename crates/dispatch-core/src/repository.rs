use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use uuid::Uuid;

use dispatch_domain::{Assignment, DeliveryStatus};

use crate::error::ServiceError;

// ── Query inputs ──────────────────────────────────────────────────────────────

/// Normalised list filters. `page` and `page_size` are already clamped
/// by the service before they reach a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilters {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<DeliveryStatus>,
    pub driver_id: Option<String>,
}

impl ListFilters {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for ListFilters {
    fn default() -> Self {
        ListFilters {
            page: 1,
            page_size: 20,
            status: None,
            driver_id: None,
        }
    }
}

/// Inclusive `created_at` window, with an optional driver filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub driver_id: Option<String>,
}

// ── Query outputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListPage {
    pub items: Vec<Assignment>,
    /// Rows matching the filter set, not the page.
    pub total: u64,
    /// Normalised paging echoed back to callers.
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryMetrics {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Mean pickup-to-delivery duration over delivered rows with both
    /// timestamps; 0 when there are none.
    pub avg_delivery_minutes: f64,
    /// Fraction in [0, 1] of delivered rows at or before their estimate;
    /// 0 when nothing was delivered in the window.
    pub on_time_rate: f64,
}

/// Work executed against a repository bound to one transactional scope.
pub type TxWork<'a> = Box<
    dyn for<'r> FnOnce(&'r dyn AssignmentRepository) -> BoxFuture<'r, Result<(), ServiceError>>
        + Send
        + 'a,
>;

// ── Repository contract ───────────────────────────────────────────────────────

/// Persistence contract owned by the use-case layer and implemented by
/// the storage adapter. Every read excludes soft-deleted rows.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create(&self, assignment: &Assignment) -> Result<(), ServiceError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Assignment, ServiceError>;

    /// Persist a mutated assignment. The write is conditional on the
    /// stored `updated_at` still matching `expected_updated_at`: a live
    /// row with a different timestamp yields
    /// [`ServiceError::ConflictingWrite`], a missing or deleted row
    /// yields [`ServiceError::NotFound`].
    async fn update(
        &self,
        assignment: &Assignment,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), ServiceError>;

    /// Filtered page in `created_at DESC, id DESC` order plus the total
    /// count for the filter set.
    async fn list(&self, filters: &ListFilters) -> Result<ListPage, ServiceError>;

    async fn metrics(&self, window: &MetricsWindow) -> Result<DeliveryMetrics, ServiceError>;

    /// Soft delete: sets `deleted_at`. `NotFound` when no live row matched.
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;

    /// Run `work` against a repository bound to one atomic scope.
    /// Commits when `work` returns `Ok`, rolls back on error; a panic
    /// unwinds and the scope rolls back on drop. Nested calls on the
    /// transactional repository are rejected with `Internal`.
    async fn with_transaction<'a>(&'a self, work: TxWork<'a>) -> Result<(), ServiceError>;
}
