use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Reports which provider credential is absent. Carries presence flags only,
/// never the configured values.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CredentialDiagnostic {
    pub has_client_id: bool,
    pub has_client_secret: bool,
}

/// Everything that can go wrong at the gateway boundary. Each variant maps
/// onto one JSON error envelope; nothing propagates unhandled.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Configuration {
        message: String,
        debug: Option<CredentialDiagnostic>,
    },

    #[error("upstream search API error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

impl GatewayError {
    pub fn missing_credentials(debug: CredentialDiagnostic) -> Self {
        GatewayError::Configuration {
            message: "API credentials not configured".to_string(),
            debug: Some(debug),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        GatewayError::Configuration {
            message: message.into(),
            debug: None,
        }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<CredentialDiagnostic>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            GatewayError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    details: None,
                    debug: None,
                },
            ),
            GatewayError::Configuration { message, debug } => {
                error!("configuration error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: message,
                        details: None,
                        debug,
                    },
                )
            }
            GatewayError::Upstream { status, message } => {
                warn!("upstream error (status {:?}): {}", status, message);
                let error = match status {
                    Some(code) => format!("upstream search API error: status {}", code),
                    None => "upstream search API error".to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error,
                        details: Some(message),
                        debug: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
