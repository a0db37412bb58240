/// Error type shared by the connector and the persistence layer
///
/// Every data operation returns `Result<T, DataError>`. The variants line up
/// with how callers are expected to react:
///
/// - `Config`: a required secret is missing, nothing was attempted
/// - `Validation`: input rejected before touching the database
/// - `NotFound`: a referenced record does not exist
/// - `Unauthorized`: caller does not own the record, nothing was mutated
/// - `Conflict`: unique constraint violation (duplicate clerk id, email, ...)
/// - `InsufficientCredits`: credit balance would drop below zero
/// - `Database`: anything else coming out of sqlx

use validator::ValidationErrors;

/// Data layer result alias
pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Required configuration value is absent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Caller is not allowed to mutate the record
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credit balance cannot go negative
    #[error("Insufficient credits: balance {balance}, requested {requested}")]
    InsufficientCredits { balance: i32, requested: i32 },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(constraint) = db_err.constraint() {
                return DataError::Conflict(format!("constraint violation: {}", constraint));
            }
        }
        DataError::Database(err)
    }
}

impl From<ValidationErrors> for DataError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid value".to_string());
                format!("{}: {}", field, message)
            })
            .collect();
        fields.sort();
        DataError::Validation(fields.join("; "))
    }
}
