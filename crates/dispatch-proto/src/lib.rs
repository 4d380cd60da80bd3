pub mod convert;

pub mod pb {
    tonic::include_proto!("delivery.v1");
}

pub use convert::ConvertError;
