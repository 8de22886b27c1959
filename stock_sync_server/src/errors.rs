use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use stock_sync_engine::{sync_objects::INVENTORY_LEVELS_UPDATE, SyncApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the record. {0}")]
    Conflict(String),
    #[error("The external platform could not complete the request. {0}")]
    PlatformError(String),
    #[error("Webhook authentication failed. {0}")]
    WebhookAuthError(#[from] WebhookAuthError),
    #[error("The webhook payload is malformed. {0}")]
    MalformedPayload(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::WebhookAuthError(e) => match e {
                WebhookAuthError::MissingHeader(_) => StatusCode::BAD_REQUEST,
                WebhookAuthError::MissingSignature => StatusCode::UNAUTHORIZED,
                WebhookAuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                WebhookAuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PlatformError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum WebhookAuthError {
    #[error("The {0} header is missing.")]
    MissingHeader(&'static str),
    #[error("No HMAC signature was found.")]
    MissingSignature,
    #[error("The HMAC signature is invalid.")]
    InvalidSignature,
    #[error("The remote peer is not on the whitelist.")]
    ForbiddenPeer,
}

impl From<SyncApiError> for ServerError {
    fn from(e: SyncApiError) -> Self {
        match e {
            SyncApiError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            SyncApiError::ProductNotLinked(_) | SyncApiError::SyncDisabled(_) => Self::Conflict(e.to_string()),
            SyncApiError::InvalidQuantity(_) | SyncApiError::InvalidRequest(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            SyncApiError::MalformedPayload(s) => Self::MalformedPayload(s),
            SyncApiError::PlatformError(_) | SyncApiError::PlatformTimeout(_) => Self::PlatformError(e.to_string()),
            SyncApiError::LedgerError(_) | SyncApiError::JournalError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl ServerError {
    /// A webhook body that does not describe an inventory level. Only raised for the inventory topic.
    pub fn bad_inventory_payload<S: std::fmt::Display>(e: S) -> Self {
        Self::MalformedPayload(format!("Expected an {INVENTORY_LEVELS_UPDATE} body. {e}"))
    }
}
