use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use wh_core::WarehouseError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Warehouse(e) => match e {
                WarehouseError::MaintenanceLockout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                WarehouseError::NotMaintainer { .. } => StatusCode::FORBIDDEN,
                WarehouseError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
                WarehouseError::Ownership(_) | WarehouseError::Type(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                WarehouseError::NoPersistence => StatusCode::NOT_IMPLEMENTED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "command failed");
        } else {
            tracing::debug!(error = %self, %status, "command refused");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_is_unavailable() {
        let err = ServerError::from(WarehouseError::MaintenanceLockout {
            description: "backup".into(),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "backup");
    }

    #[test]
    fn client_errors() {
        let err = ServerError::from(WarehouseError::InvalidCommand("bad".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = ServerError::Config("x".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
