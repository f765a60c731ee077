use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GsiError {
    /// `auth.key1` does not match the configured secret.
    #[error("Unauthorized GSI request (token: {token:?})")]
    Unauthorized { token: String },

    #[error("Malformed GSI payload: {0}")]
    MalformedInput(String),

    #[error("Lighting device fault: {0}")]
    DeviceFault(String),

    /// The lighting controller could not be reached at startup.
    #[error("Lighting controller unavailable: {0}")]
    StartupFault(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GsiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GsiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            GsiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GsiError {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}
