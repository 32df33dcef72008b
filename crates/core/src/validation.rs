//! Field checks shared by the entity DTOs.

use std::borrow::Cow;

use validator::{Validate, ValidationError};

use crate::error::CoreError;

/// Reject strings that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("must not be blank"));
        return Err(err);
    }
    Ok(())
}

/// Run derive-based validation and convert failures into [`CoreError`].
pub fn check<T: Validate>(input: &T) -> Result<(), CoreError> {
    input.validate().map_err(CoreError::from)
}
