//! Wire ↔ domain conversions shared by the gRPC service and the REST
//! gateway.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use dispatch_domain::{Address, Assignment, AssignmentRecord, DeliveryStatus};

use crate::pb;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid {field}: {message}")]
    Field { field: String, message: String },
}

impl ConvertError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        ConvertError::Field {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ── Timestamps ────────────────────────────────────────────────────────────────

pub fn timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

pub fn datetime(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32)
}

pub fn optional_datetime(ts: Option<&prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    ts.and_then(datetime)
}

// ── Status ────────────────────────────────────────────────────────────────────

pub fn status_to_proto(status: DeliveryStatus) -> pb::DeliveryStatus {
    match status {
        DeliveryStatus::Pending => pb::DeliveryStatus::Pending,
        DeliveryStatus::Assigned => pb::DeliveryStatus::Assigned,
        DeliveryStatus::PickedUp => pb::DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit => pb::DeliveryStatus::InTransit,
        DeliveryStatus::Delivered => pb::DeliveryStatus::Delivered,
        DeliveryStatus::Failed => pb::DeliveryStatus::Failed,
        DeliveryStatus::Cancelled => pb::DeliveryStatus::Cancelled,
    }
}

pub fn status_from_proto(status: pb::DeliveryStatus) -> Option<DeliveryStatus> {
    match status {
        pb::DeliveryStatus::Unspecified => None,
        pb::DeliveryStatus::Pending => Some(DeliveryStatus::Pending),
        pb::DeliveryStatus::Assigned => Some(DeliveryStatus::Assigned),
        pb::DeliveryStatus::PickedUp => Some(DeliveryStatus::PickedUp),
        pb::DeliveryStatus::InTransit => Some(DeliveryStatus::InTransit),
        pb::DeliveryStatus::Delivered => Some(DeliveryStatus::Delivered),
        pb::DeliveryStatus::Failed => Some(DeliveryStatus::Failed),
        pb::DeliveryStatus::Cancelled => Some(DeliveryStatus::Cancelled),
    }
}

/// Resolve a wire name to the proto enum, accepting both the canonical
/// prefixed form and the short alias.
pub fn status_from_wire_name(name: &str) -> Option<pb::DeliveryStatus> {
    pb::DeliveryStatus::from_str_name(name).or_else(|| {
        pb::DeliveryStatus::from_str_name(&format!("DELIVERY_STATUS_{name}"))
    })
}

// ── Addresses ─────────────────────────────────────────────────────────────────

pub fn address_to_proto(addr: &Address) -> pb::Address {
    pb::Address {
        street: addr.street.clone(),
        city: addr.city.clone(),
        state: addr.state.clone(),
        postal_code: addr.postal_code.clone(),
        country: addr.country.clone(),
        latitude: addr.latitude,
        longitude: addr.longitude,
    }
}

pub fn address_from_proto(addr: &pb::Address) -> Address {
    Address {
        street: addr.street.clone(),
        city: addr.city.clone(),
        state: addr.state.clone(),
        postal_code: addr.postal_code.clone(),
        country: addr.country.clone(),
        latitude: addr.latitude,
        longitude: addr.longitude,
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

pub fn delivery_to_proto(a: &Assignment) -> pb::Delivery {
    pb::Delivery {
        id: a.id().to_string(),
        order_id: a.order_id().to_string(),
        driver_id: a.driver_id().unwrap_or_default().to_string(),
        status: status_to_proto(a.status()).into(),
        pickup_address: Some(address_to_proto(a.pickup_address())),
        delivery_address: Some(address_to_proto(a.delivery_address())),
        scheduled_pickup_time: Some(timestamp(a.scheduled_pickup_time())),
        estimated_delivery_time: Some(timestamp(a.estimated_delivery_time())),
        actual_pickup_time: a.actual_pickup_time().map(timestamp),
        actual_delivery_time: a.actual_delivery_time().map(timestamp),
        notes: a.notes().to_string(),
        created_at: Some(timestamp(a.created_at())),
        updated_at: Some(timestamp(a.updated_at())),
    }
}

/// Decode a wire `Delivery` back into the domain entity. Used by the
/// round-trip tests and by clients that want typed access.
pub fn assignment_from_proto(d: &pb::Delivery) -> Result<Assignment, ConvertError> {
    let id = Uuid::parse_str(&d.id).map_err(|e| ConvertError::field("id", e.to_string()))?;
    let status = status_from_proto(d.status())
        .ok_or_else(|| ConvertError::field("status", "unspecified"))?;
    let pickup_address = d
        .pickup_address
        .as_ref()
        .map(address_from_proto)
        .ok_or_else(|| ConvertError::field("pickup_address", "missing"))?;
    let delivery_address = d
        .delivery_address
        .as_ref()
        .map(address_from_proto)
        .ok_or_else(|| ConvertError::field("delivery_address", "missing"))?;
    let scheduled_pickup_time = optional_datetime(d.scheduled_pickup_time.as_ref())
        .ok_or_else(|| ConvertError::field("scheduled_pickup_time", "missing"))?;
    let estimated_delivery_time = optional_datetime(d.estimated_delivery_time.as_ref())
        .ok_or_else(|| ConvertError::field("estimated_delivery_time", "missing"))?;
    let created_at = optional_datetime(d.created_at.as_ref())
        .ok_or_else(|| ConvertError::field("created_at", "missing"))?;
    let updated_at = optional_datetime(d.updated_at.as_ref())
        .ok_or_else(|| ConvertError::field("updated_at", "missing"))?;

    Ok(Assignment::from_record(AssignmentRecord {
        id,
        order_id: d.order_id.clone(),
        driver_id: if d.driver_id.is_empty() {
            None
        } else {
            Some(d.driver_id.clone())
        },
        status,
        pickup_address,
        delivery_address,
        scheduled_pickup_time,
        estimated_delivery_time,
        actual_pickup_time: optional_datetime(d.actual_pickup_time.as_ref()),
        actual_delivery_time: optional_datetime(d.actual_delivery_time.as_ref()),
        notes: d.notes.clone(),
        created_at,
        updated_at,
        deleted_at: None,
    }))
}
