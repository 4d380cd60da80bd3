pub mod gateway;
pub mod grpc;
pub mod observability;
pub mod pipeline;

pub use grpc::DeliveryGrpc;
pub use pipeline::metrics::ApiMetrics;
pub use pipeline::RpcPipeline;
