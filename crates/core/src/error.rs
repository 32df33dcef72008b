use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An immutable field (`created_at`, a comment's `parent_id`) was changed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A required parent reference does not exist.
    #[error("Referenced {entity} with id {id} does not exist")]
    ReferenceNotFound { entity: &'static str, id: DbId },

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("{entity} {id} still has {active_children} active children")]
    HasActiveChildren {
        entity: &'static str,
        id: DbId,
        active_children: usize,
    },

    #[error("Operation log entry {id} is immutable")]
    ImmutableRecord { id: DbId },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {detail}")
            })
            .collect();
        fields.sort();
        CoreError::Validation(fields.join("; "))
    }
}
