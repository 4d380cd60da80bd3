use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransitionError;

// ── Address ───────────────────────────────────────────────────────────────────

/// Postal address embedded in an assignment. Immutable once attached;
/// a 0/0 coordinate pair means "no coordinates".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 7] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Assigned,
        DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Assigned => "ASSIGNED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse a wire or storage name. Accepts both the short form
    /// (`PENDING`) and the prefixed canonical form
    /// (`DELIVERY_STATUS_PENDING`).
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.strip_prefix("DELIVERY_STATUS_").unwrap_or(s);
        match name {
            "PENDING" => Some(DeliveryStatus::Pending),
            "ASSIGNED" => Some(DeliveryStatus::Assigned),
            "PICKED_UP" => Some(DeliveryStatus::PickedUp),
            "IN_TRANSIT" => Some(DeliveryStatus::InTransit),
            "DELIVERED" => Some(DeliveryStatus::Delivered),
            "FAILED" => Some(DeliveryStatus::Failed),
            "CANCELLED" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Cancelled
        )
    }

    /// The transition table. Anything not listed here is forbidden.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, PickedUp)
                | (Assigned, Cancelled)
                | (PickedUp, InTransit)
                | (PickedUp, Failed)
                | (InTransit, Delivered)
                | (InTransit, Failed)
        )
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

/// One delivery job. The aggregate root of this service.
///
/// Fields are private: the only mutations are [`Assignment::assign_driver`]
/// and [`Assignment::update_status`], which enforce the transition table
/// and apply the timestamp side-effects, plus the soft-delete marker used
/// by the storage layer. Everything else is read-only after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    id: Uuid,
    order_id: String,
    driver_id: Option<String>,
    status: DeliveryStatus,
    pickup_address: Address,
    delivery_address: Address,
    scheduled_pickup_time: DateTime<Utc>,
    estimated_delivery_time: DateTime<Utc>,
    actual_pickup_time: Option<DateTime<Utc>>,
    actual_delivery_time: Option<DateTime<Utc>>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Flattened field set used to move an [`Assignment`] across the storage
/// boundary without exposing mutators. Constructed by storage adapters
/// when rehydrating rows and by tests that need historical state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub order_id: String,
    pub driver_id: Option<String>,
    pub status: DeliveryStatus,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub scheduled_pickup_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Construct a fresh assignment in `PENDING`. Semantic validation
    /// (lead times, address shape) is the validator's job, not ours.
    pub fn new(
        order_id: impl Into<String>,
        pickup_address: Address,
        delivery_address: Address,
        scheduled_pickup_time: DateTime<Utc>,
        estimated_delivery_time: DateTime<Utc>,
        notes: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Assignment {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            driver_id: None,
            status: DeliveryStatus::Pending,
            pickup_address,
            delivery_address,
            scheduled_pickup_time,
            estimated_delivery_time,
            actual_pickup_time: None,
            actual_delivery_time: None,
            notes: notes.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn from_record(rec: AssignmentRecord) -> Self {
        Assignment {
            id: rec.id,
            order_id: rec.order_id,
            driver_id: rec.driver_id,
            status: rec.status,
            pickup_address: rec.pickup_address,
            delivery_address: rec.delivery_address,
            scheduled_pickup_time: rec.scheduled_pickup_time,
            estimated_delivery_time: rec.estimated_delivery_time,
            actual_pickup_time: rec.actual_pickup_time,
            actual_delivery_time: rec.actual_delivery_time,
            notes: rec.notes,
            created_at: rec.created_at,
            updated_at: rec.updated_at,
            deleted_at: rec.deleted_at,
        }
    }

    pub fn to_record(&self) -> AssignmentRecord {
        AssignmentRecord {
            id: self.id,
            order_id: self.order_id.clone(),
            driver_id: self.driver_id.clone(),
            status: self.status,
            pickup_address: self.pickup_address.clone(),
            delivery_address: self.delivery_address.clone(),
            scheduled_pickup_time: self.scheduled_pickup_time,
            estimated_delivery_time: self.estimated_delivery_time,
            actual_pickup_time: self.actual_pickup_time,
            actual_delivery_time: self.actual_delivery_time,
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn driver_id(&self) -> Option<&str> {
        self.driver_id.as_deref()
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn pickup_address(&self) -> &Address {
        &self.pickup_address
    }

    pub fn delivery_address(&self) -> &Address {
        &self.delivery_address
    }

    pub fn scheduled_pickup_time(&self) -> DateTime<Utc> {
        self.scheduled_pickup_time
    }

    pub fn estimated_delivery_time(&self) -> DateTime<Utc> {
        self.estimated_delivery_time
    }

    pub fn actual_pickup_time(&self) -> Option<DateTime<Utc>> {
        self.actual_pickup_time
    }

    pub fn actual_delivery_time(&self) -> Option<DateTime<Utc>> {
        self.actual_delivery_time
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Attach a driver: the `PENDING → ASSIGNED` transition.
    ///
    /// The caller must have checked that `driver_id` is non-empty; this
    /// only enforces the state machine.
    pub fn assign_driver(&mut self, driver_id: impl Into<String>) -> Result<(), TransitionError> {
        if self.status != DeliveryStatus::Pending {
            return Err(TransitionError {
                from: self.status,
                to: DeliveryStatus::Assigned,
            });
        }
        self.driver_id = Some(driver_id.into());
        self.status = DeliveryStatus::Assigned;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `next` per the transition table, applying timestamp
    /// side-effects and the optional notes overwrite.
    pub fn update_status(
        &mut self,
        next: DeliveryStatus,
        notes: Option<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        match next {
            DeliveryStatus::PickedUp => self.actual_pickup_time = Some(now),
            DeliveryStatus::Delivered => self.actual_delivery_time = Some(now),
            _ => {}
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Soft-delete marker. Called by storage adapters only; a deleted
    /// assignment is invisible to every read path.
    pub fn mark_deleted(&mut self) {
        self.deleted_at = Some(Utc::now());
    }
}
