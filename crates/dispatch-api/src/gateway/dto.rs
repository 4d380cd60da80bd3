//! JSON bodies for the REST surface. Field names are the snake_case
//! forms of the domain model; timestamps are RFC 3339; statuses are
//! emitted in the prefixed canonical form and accepted in either form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispatch_proto::pb;

use super::error::ApiError;

// ── Shared ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressBody {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl AddressBody {
    pub fn into_proto(self) -> pb::Address {
        pb::Address {
            street: self.street,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn from_proto(addr: &pb::Address) -> Self {
        AddressBody {
            street: addr.street.clone(),
            city: addr.city.clone(),
            state: addr.state.clone(),
            postal_code: addr.postal_code.clone(),
            country: addr.country.clone(),
            latitude: addr.latitude,
            longitude: addr.longitude,
        }
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────
//
// Missing fields deserialize to their empty forms so the use-case
// validator reports them as per-field errors rather than the JSON layer
// rejecting the envelope wholesale.

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryBody {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub pickup_address: AddressBody,
    #[serde(default)]
    pub delivery_address: AddressBody,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    #[serde(default)]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverBody {
    #[serde(default)]
    pub driver_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<String>,
    pub driver_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub driver_id: Option<String>,
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryBody {
    pub id: String,
    pub order_id: String,
    pub driver_id: Option<String>,
    /// Prefixed canonical form, e.g. `DELIVERY_STATUS_PENDING`.
    pub status: String,
    pub pickup_address: AddressBody,
    pub delivery_address: AddressBody,
    pub scheduled_pickup_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryBody {
    pub fn from_proto(d: &pb::Delivery, request_id: &str) -> Result<Self, ApiError> {
        let ts = |field: &str, value: Option<&prost_types::Timestamp>| {
            dispatch_proto::convert::optional_datetime(value).ok_or_else(|| {
                ApiError::internal(
                    format!("delivery payload missing {field}"),
                    request_id.to_string(),
                )
            })
        };
        Ok(DeliveryBody {
            id: d.id.clone(),
            order_id: d.order_id.clone(),
            driver_id: if d.driver_id.is_empty() {
                None
            } else {
                Some(d.driver_id.clone())
            },
            status: d.status().as_str_name().to_string(),
            pickup_address: d
                .pickup_address
                .as_ref()
                .map(AddressBody::from_proto)
                .unwrap_or_default(),
            delivery_address: d
                .delivery_address
                .as_ref()
                .map(AddressBody::from_proto)
                .unwrap_or_default(),
            scheduled_pickup_time: ts("scheduled_pickup_time", d.scheduled_pickup_time.as_ref())?,
            estimated_delivery_time: ts(
                "estimated_delivery_time",
                d.estimated_delivery_time.as_ref(),
            )?,
            actual_pickup_time: dispatch_proto::convert::optional_datetime(
                d.actual_pickup_time.as_ref(),
            ),
            actual_delivery_time: dispatch_proto::convert::optional_datetime(
                d.actual_delivery_time.as_ref(),
            ),
            notes: d.notes.clone(),
            created_at: ts("created_at", d.created_at.as_ref())?,
            updated_at: ts("updated_at", d.updated_at.as_ref())?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListDeliveriesBody {
    pub deliveries: Vec<DeliveryBody>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsBody {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub avg_delivery_minutes: f64,
    pub on_time_rate: f64,
}
