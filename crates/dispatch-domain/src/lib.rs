pub mod error;
pub mod types;
pub mod validate;

mod tests;

pub use error::TransitionError;
pub use types::{Address, Assignment, AssignmentRecord, DeliveryStatus};
pub use validate::{FieldError, ValidationErrors, Validator};
