pub mod friends;
pub mod health;
pub mod users;

use tablero_shared::validation;

/// Request-body check that trims exactly like the repositories do.
pub(crate) fn username_field(value: &str) -> Result<(), validator::ValidationError> {
    validation::username("username", value)
        .map(|_| ())
        .map_err(|e| {
            let mut err = validator::ValidationError::new("username");
            err.message = Some(e.to_string().into());
            err
        })
}
