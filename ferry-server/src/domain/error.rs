//! Domain error types.

/// Domain-level validation errors, distinct from graph lookup and IO errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// A route plan was built from zero segments.
    #[error("route plan must have at least one segment")]
    EmptyPlan,
}
