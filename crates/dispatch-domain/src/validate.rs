use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::Address;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Per-field failures accumulated by a [`Validator`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ── Validator ─────────────────────────────────────────────────────────────────

/// Rule accumulator. Callers chain rule calls tagged with a field name,
/// then call [`Validator::finish`]; any failed rule surfaces in one
/// [`ValidationErrors`] value. No IO, no entity knowledge.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
        self
    }

    /// Non-empty after whitespace trim.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "is required");
        }
        self
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let n = value.chars().count();
        if n < min || n > max {
            self.fail(field, format!("must be between {min} and {max} characters"));
        }
        self
    }

    /// The wire analogue of a zero/absent timestamp.
    pub fn time_set(&mut self, field: &str, value: Option<DateTime<Utc>>) -> &mut Self {
        if value.is_none() {
            self.fail(field, "is required");
        }
        self
    }

    /// Strictly after the current instant.
    pub fn time_future(&mut self, field: &str, value: DateTime<Utc>) -> &mut Self {
        if value <= Utc::now() {
            self.fail(field, "must be in the future");
        }
        self
    }

    /// At or after `reference`.
    pub fn time_at_or_after(
        &mut self,
        field: &str,
        value: DateTime<Utc>,
        reference: DateTime<Utc>,
        description: &str,
    ) -> &mut Self {
        if value < reference {
            self.fail(field, format!("must be {description}"));
        }
        self
    }

    /// At or before `reference`.
    pub fn time_at_or_before(
        &mut self,
        field: &str,
        value: DateTime<Utc>,
        reference: DateTime<Utc>,
        description: &str,
    ) -> &mut Self {
        if value > reference {
            self.fail(field, format!("must be {description}"));
        }
        self
    }

    /// Required fields, postal-code shape, and coordinate ranges of an
    /// address. Rule names are prefixed with `prefix.` so that failures
    /// from the pickup and delivery addresses stay distinguishable.
    pub fn address(&mut self, prefix: &str, addr: &Address) -> &mut Self {
        self.required(&format!("{prefix}.street"), &addr.street);
        self.required(&format!("{prefix}.city"), &addr.city);
        self.required(&format!("{prefix}.state"), &addr.state);
        self.required(&format!("{prefix}.country"), &addr.country);

        let postal_field = format!("{prefix}.postal_code");
        self.required(&postal_field, &addr.postal_code);
        if !addr.postal_code.trim().is_empty() && !postal_code_shape(&addr.postal_code) {
            self.fail(&postal_field, "must be 3-10 letters, digits, spaces or dashes");
        }

        self.range(&format!("{prefix}.latitude"), addr.latitude, -90.0, 90.0);
        self.range(&format!("{prefix}.longitude"), addr.longitude, -180.0, 180.0);
        self
    }

    /// UUID shape check.
    pub fn uuid(&mut self, field: &str, value: &str) -> &mut Self {
        if Uuid::parse_str(value).is_err() {
            self.fail(field, "must be a valid UUID");
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.fail(field, format!("must be one of: {}", allowed.join(", ")));
        }
        self
    }

    pub fn range(&mut self, field: &str, value: f64, min: f64, max: f64) -> &mut Self {
        if value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors: self.errors })
        }
    }
}

fn postal_code_shape(code: &str) -> bool {
    let code = code.trim();
    (3..=10).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
}
