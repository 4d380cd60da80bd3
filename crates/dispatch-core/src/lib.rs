pub mod context;
pub mod error;
pub mod repository;
pub mod service;

pub use context::RequestContext;
pub use error::ServiceError;
pub use repository::{
    AssignmentRepository, DeliveryMetrics, ListFilters, ListPage, MetricsWindow, TxWork,
};
pub use service::{
    AssignDriverInput, AssignmentService, CreateAssignmentInput, GetMetricsInput,
    ListAssignmentsInput, UpdateStatusInput,
};
