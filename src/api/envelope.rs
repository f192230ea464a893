use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::error;

use crate::db::StoreError;
use crate::models::ClientRecord;

pub const CREATED_MESSAGE: &str = "Cliente registrado correctamente.";
pub const VALIDATION_MESSAGE: &str = "Todos los campos son obligatorios.";
pub const NOT_SUPPORTED_MESSAGE: &str = "Método o acción no permitida.";
pub const NOT_PERSISTED_MESSAGE: &str = "Error: No se pudo guardar el cliente.";

const JSON_UTF8: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    StoreUnavailable,
    QueryFailed,
    StoreRejected,
    NotPersisted,
    ValidationRejected,
    NotSupported,
}

impl FailureKind {
    pub fn status(self) -> StatusCode {
        match self {
            FailureKind::ValidationRejected => StatusCode::BAD_REQUEST,
            FailureKind::NotSupported => StatusCode::METHOD_NOT_ALLOWED,
            FailureKind::StoreUnavailable
            | FailureKind::QueryFailed
            | FailureKind::StoreRejected
            | FailureKind::NotPersisted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_store(err: &StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => FailureKind::StoreUnavailable,
            StoreError::QueryFailed(_) => FailureKind::QueryFailed,
            StoreError::Rejected(_) => FailureKind::StoreRejected,
            StoreError::NotPersisted => FailureKind::NotPersisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiFailure {
    pub fn listing(err: &StoreError) -> Self {
        Self {
            kind: FailureKind::from_store(err),
            message: format!("Error al listar clientes: {err}"),
        }
    }

    pub fn inserting(err: &StoreError) -> Self {
        let message = match err {
            StoreError::NotPersisted => NOT_PERSISTED_MESSAGE.to_string(),
            other => format!("Error al ejecutar el INSERT: {other}"),
        };
        Self {
            kind: FailureKind::from_store(err),
            message,
        }
    }

    pub fn validation() -> Self {
        Self {
            kind: FailureKind::ValidationRejected,
            message: VALIDATION_MESSAGE.to_string(),
        }
    }

    pub fn not_supported() -> Self {
        Self {
            kind: FailureKind::NotSupported,
            message: NOT_SUPPORTED_MESSAGE.to_string(),
        }
    }
}

/// Every response the endpoint produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Listed(Vec<ClientRecord>),
    Created { id: i32 },
    Failed(ApiFailure),
}

impl Envelope {
    pub fn status(&self) -> StatusCode {
        match self {
            Envelope::Listed(_) | Envelope::Created { .. } => StatusCode::OK,
            Envelope::Failed(failure) => failure.kind.status(),
        }
    }
}

impl From<ApiFailure> for Envelope {
    fn from(failure: ApiFailure) -> Self {
        Envelope::Failed(failure)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Envelope::Listed(clients) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("clientes", clients)?;
            }
            Envelope::Created { id } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("message", CREATED_MESSAGE)?;
                map.serialize_entry("id", id)?;
            }
            Envelope::Failed(failure) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("message", &failure.message)?;
            }
        }
        map.end()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = self.status();
        match serde_json::to_vec(&self) {
            Ok(body) => (status, [(header::CONTENT_TYPE, JSON_UTF8)], body).into_response(),
            Err(err) => {
                error!(error = %err, "failed to encode response envelope");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, JSON_UTF8)],
                    r#"{"success":false}"#,
                )
                    .into_response()
            }
        }
    }
}
