// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

// endregion: --- Imports

// region:    --- Auction Error

/// Every failure an auction operation can surface to a caller.
///
/// Business-rule failures are terminal; `Superseded` and `Database` are the
/// only kinds a client may retry.
#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("auction time expired")]
    Expired,

    #[error("bid too low, minimum bid is {minimum}")]
    BelowMinimum { minimum: i64 },

    #[error("insufficient points: balance {balance}, bid {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("bid was superseded by a higher bid")]
    Superseded,

    #[error("{0}")]
    Validation(String),

    #[error("admin secret missing or invalid")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// Postgres SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for AuctionError {
    fn from(e: sqlx::Error) -> Self {
        let out_of_range = e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == NUMERIC_OUT_OF_RANGE);
        if out_of_range {
            return AuctionError::Validation("balance out of range".to_string());
        }
        AuctionError::Database(e)
    }
}

impl AuctionError {
    /// Stable machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::NotFound(_) => "NOT_FOUND",
            AuctionError::InvalidState(_) => "INVALID_STATE",
            AuctionError::Expired => "EXPIRED",
            AuctionError::BelowMinimum { .. } => "BELOW_MINIMUM",
            AuctionError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AuctionError::Superseded => "SUPERSEDED",
            AuctionError::Validation(_) => "VALIDATION",
            AuctionError::Unauthorized => "UNAUTHORIZED",
            AuctionError::Database(_) => "DATABASE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AuctionError::Superseded | AuctionError::Database(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuctionError::NotFound(_) => StatusCode::NOT_FOUND,
            AuctionError::InvalidState(_) | AuctionError::Expired | AuctionError::Superseded => {
                StatusCode::CONFLICT
            }
            AuctionError::BelowMinimum { .. }
            | AuctionError::InsufficientBalance { .. }
            | AuctionError::Validation(_) => StatusCode::BAD_REQUEST,
            AuctionError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuctionError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        // infrastructure details stay in the log
        let message = match &self {
            AuctionError::Database(e) => {
                error!("{:<12} --> database failure: {:?}", "Error", e);
                "temporary storage failure, please retry".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        match &self {
            AuctionError::BelowMinimum { minimum } => body["minimum"] = json!(minimum),
            AuctionError::InsufficientBalance { balance, .. } => body["balance"] = json!(balance),
            _ => {}
        }

        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AuctionError>;

// endregion: --- Auction Error

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(AuctionError::Superseded.is_retryable());
        assert!(AuctionError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!AuctionError::Expired.is_retryable());
        assert!(!AuctionError::BelowMinimum { minimum: 210 }.is_retryable());
    }

    #[test]
    fn non_database_sqlx_errors_stay_retryable() {
        let err = AuctionError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), "DATABASE");
        assert!(err.is_retryable());
    }

    #[test]
    fn below_minimum_message_names_the_floor() {
        let err = AuctionError::BelowMinimum { minimum: 210 };
        assert_eq!(err.code(), "BELOW_MINIMUM");
        assert!(err.to_string().contains("210"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
// endregion: --- Tests
