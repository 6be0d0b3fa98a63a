pub mod health;
pub mod reports;
pub mod sanctions;

use tablero_shared::validation;

/// Request-body check that trims exactly like the repositories do.
pub(crate) fn reason_field(value: &str) -> Result<(), validator::ValidationError> {
    validation::reason("reason", value)
        .map(|_| ())
        .map_err(|e| {
            let mut err = validator::ValidationError::new("reason");
            err.message = Some(e.to_string().into());
            err
        })
}
