#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::types::*;
    use crate::validate::Validator;

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

    fn fresh() -> Assignment {
        let now = Utc::now();
        Assignment::new(
            "ORDER-1",
            address(),
            address(),
            now + Duration::hours(1),
            now + Duration::hours(3),
            "",
        )
    }

    // ── State machine ─────────────────────────────────────────────────────────

    #[test]
    fn new_assignment_starts_pending() {
        let a = fresh();
        assert_eq!(a.status(), DeliveryStatus::Pending);
        assert!(a.driver_id().is_none());
        assert_eq!(a.created_at(), a.updated_at());
        assert!(a.actual_pickup_time().is_none());
        assert!(a.actual_delivery_time().is_none());
        assert!(!a.is_deleted());
    }

    #[test]
    fn transition_table_is_exact() {
        use DeliveryStatus::*;
        let allowed = [
            (Pending, Assigned),
            (Pending, Cancelled),
            (Assigned, PickedUp),
            (Assigned, Cancelled),
            (PickedUp, InTransit),
            (PickedUp, Failed),
            (InTransit, Delivered),
            (InTransit, Failed),
        ];
        for from in DeliveryStatus::ALL {
            for to in DeliveryStatus::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use DeliveryStatus::*;
        for terminal in [Delivered, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for to in DeliveryStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
        for live in [Pending, Assigned, PickedUp, InTransit] {
            assert!(!live.is_terminal());
        }
    }

    #[test]
    fn assign_driver_moves_to_assigned() {
        let mut a = fresh();
        a.assign_driver("DRIVER-1").unwrap();
        assert_eq!(a.status(), DeliveryStatus::Assigned);
        assert_eq!(a.driver_id(), Some("DRIVER-1"));
        assert!(a.updated_at() >= a.created_at());
    }

    #[test]
    fn assign_driver_rejected_outside_pending() {
        let mut a = fresh();
        a.assign_driver("DRIVER-1").unwrap();
        let err = a.assign_driver("DRIVER-2").unwrap_err();
        assert_eq!(err.from, DeliveryStatus::Assigned);
        assert_eq!(err.to, DeliveryStatus::Assigned);
        // the original driver survives a rejected re-assignment
        assert_eq!(a.driver_id(), Some("DRIVER-1"));
    }

    #[test]
    fn picked_up_sets_actual_pickup_time() {
        let mut a = fresh();
        a.assign_driver("DRIVER-1").unwrap();
        let before = Utc::now();
        a.update_status(DeliveryStatus::PickedUp, None).unwrap();
        let t = a.actual_pickup_time().expect("pickup time set");
        assert!(t >= before && t <= Utc::now());
        assert!(a.actual_delivery_time().is_none());
    }

    #[test]
    fn delivered_sets_actual_delivery_time() {
        let mut a = fresh();
        a.assign_driver("DRIVER-1").unwrap();
        a.update_status(DeliveryStatus::PickedUp, None).unwrap();
        a.update_status(DeliveryStatus::InTransit, None).unwrap();
        a.update_status(DeliveryStatus::Delivered, None).unwrap();
        let pickup = a.actual_pickup_time().unwrap();
        let delivered = a.actual_delivery_time().unwrap();
        assert!(delivered >= pickup);
        assert_eq!(a.status(), DeliveryStatus::Delivered);
    }

    #[test]
    fn forbidden_transition_leaves_entity_unchanged() {
        let mut a = fresh();
        let before = a.clone();
        let err = a.update_status(DeliveryStatus::Delivered, None).unwrap_err();
        assert_eq!(err.from, DeliveryStatus::Pending);
        assert_eq!(err.to, DeliveryStatus::Delivered);
        assert_eq!(a, before);
    }

    #[test]
    fn update_status_overwrites_notes_when_given() {
        let mut a = fresh();
        a.update_status(DeliveryStatus::Cancelled, Some("customer cancelled".into()))
            .unwrap();
        assert_eq!(a.notes(), "customer cancelled");

        let mut b = fresh();
        b.assign_driver("DRIVER-1").unwrap();
        b.update_status(DeliveryStatus::PickedUp, None).unwrap();
        assert_eq!(b.notes(), "");
    }

    #[test]
    fn record_round_trip_preserves_every_field() {
        let mut a = fresh();
        a.assign_driver("DRIVER-1").unwrap();
        a.update_status(DeliveryStatus::PickedUp, Some("at dock 4".into()))
            .unwrap();
        let back = Assignment::from_record(a.to_record());
        assert_eq!(a, back);
    }

    // ── Status names ──────────────────────────────────────────────────────────

    #[test]
    fn status_parses_short_and_prefixed_names() {
        for s in DeliveryStatus::ALL {
            assert_eq!(DeliveryStatus::parse(s.as_str()), Some(s));
            let prefixed = format!("DELIVERY_STATUS_{}", s.as_str());
            assert_eq!(DeliveryStatus::parse(&prefixed), Some(s));
        }
        assert_eq!(DeliveryStatus::parse("SHIPPED"), None);
        assert_eq!(DeliveryStatus::parse("pending"), None);
    }

    #[test]
    fn status_serde_uses_screaming_snake() {
        let json = serde_json::to_string(&DeliveryStatus::PickedUp).unwrap();
        assert_eq!(json, "\"PICKED_UP\"");
        let back: DeliveryStatus = serde_json::from_str("\"IN_TRANSIT\"").unwrap();
        assert_eq!(back, DeliveryStatus::InTransit);
    }

    // ── Validator ─────────────────────────────────────────────────────────────

    #[test]
    fn validator_accumulates_per_field() {
        let mut v = Validator::new();
        v.required("order_id", "  ");
        v.length("driver_id", "", 1, 100);
        let err = v.finish().unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.errors[0].field, "order_id");
        assert_eq!(err.errors[1].field, "driver_id");
    }

    #[test]
    fn validator_passes_clean_input() {
        let mut v = Validator::new();
        v.required("order_id", "ORDER-1")
            .length("order_id", "ORDER-1", 1, 100)
            .uuid("id", "3f2f2a44-9d2b-4a1a-bb0c-0a4c5a1f2b3c")
            .one_of("status", "PENDING", &["PENDING", "ASSIGNED"])
            .range("lat", 45.0, -90.0, 90.0);
        assert!(v.is_valid());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn validator_rejects_bad_uuid_and_enum() {
        let mut v = Validator::new();
        v.uuid("id", "not-a-uuid");
        v.one_of("status", "SHIPPED", &["PENDING"]);
        let err = v.finish().unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn address_rule_checks_fields_and_coordinates() {
        let mut bad = address();
        bad.city = "".into();
        bad.postal_code = "x".into();
        bad.latitude = 91.0;
        let mut v = Validator::new();
        v.address("pickup_address", &bad);
        let err = v.finish().unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"pickup_address.city"));
        assert!(fields.contains(&"pickup_address.postal_code"));
        assert!(fields.contains(&"pickup_address.latitude"));
    }

    #[test]
    fn address_rule_accepts_unset_coordinates() {
        let mut a = address();
        a.latitude = 0.0;
        a.longitude = 0.0;
        let mut v = Validator::new();
        v.address("delivery_address", &a);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn time_rules() {
        let now = Utc::now();
        let mut v = Validator::new();
        v.time_set("scheduled_pickup_time", None);
        v.time_future("estimated_delivery_time", now - Duration::seconds(1));
        v.time_at_or_after(
            "estimated_delivery_time",
            now,
            now + Duration::minutes(15),
            "at least 15 minutes after the scheduled pickup",
        );
        let err = v.finish().unwrap_err();
        assert_eq!(err.errors.len(), 3);

        let mut ok = Validator::new();
        ok.time_set("scheduled_pickup_time", Some(now));
        ok.time_future("scheduled_pickup_time", now + Duration::hours(1));
        // exactly at the reference passes
        ok.time_at_or_after("t", now, now, "on time");
        ok.time_at_or_before("t", now, now, "on time");
        assert!(ok.finish().is_ok());
    }

    #[test]
    fn validation_errors_display_joins_fields() {
        let mut v = Validator::new();
        v.required("order_id", "");
        v.uuid("id", "nope");
        let err = v.finish().unwrap_err();
        let s = err.to_string();
        assert!(s.contains("order_id: is required"));
        assert!(s.contains("id: must be a valid UUID"));
    }
}
