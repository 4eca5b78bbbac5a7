use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mailwright::errors::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value, set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration path
pub fn to_env_var(field_path: &str) -> String {
    format!("MAILWRIGHT_{}", field_path.to_uppercase().replace('.', "__"))
}

/// Error answered as `{"error": message}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound(err.to_string()),
            StoreError::MissingFields => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "MAILWRIGHT_PROVIDER__API_KEY");
        assert_eq!(to_env_var("server.port"), "MAILWRIGHT_SERVER__PORT");
    }

    #[test]
    fn test_store_errors_map_to_status() {
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::MissingFields).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
