//! Tipos de error de la aplicación y su traducción a respuestas HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Fallos del cliente de chat contra la API de Blackbox.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("BLACKBOX_API_KEY no está configurada")]
    Config,

    #[error("Blackbox 401: {0}")]
    Auth(String),

    #[error("Forma inesperada en la respuesta de Blackbox")]
    ResponseShape,

    #[error("Todos los modelos fallaron. Errores: {0}")]
    AllModelsFailed(String),
}

/// Error de alto nivel que devuelven los handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("No se pudo parsear el JSON del modelo: {0}")]
    GraphParse(String),

    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Error interno: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn upload(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Upload {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Chat(ChatError::Config) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Chat(ChatError::Auth(_)) => StatusCode::UNAUTHORIZED,
            AppError::Chat(ChatError::ResponseShape) => StatusCode::BAD_GATEWAY,
            AppError::Chat(ChatError::AllModelsFailed(_)) => StatusCode::BAD_GATEWAY,
            AppError::GraphParse(_) => StatusCode::BAD_GATEWAY,
            AppError::Upload { status, .. } => *status,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!("{} -> {}", status, message);
        } else {
            warn!("{} -> {}", status, message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_expected_status() {
        assert_eq!(
            AppError::from(ChatError::Config).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(ChatError::Auth("bad key".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(ChatError::ResponseShape).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ChatError::AllModelsFailed("m: 404".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn request_errors_are_client_errors() {
        assert_eq!(
            AppError::upload(StatusCode::PAYLOAD_TOO_LARGE, "demasiados").status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Validation("Falta la pregunta".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn all_models_failed_keeps_the_notes() {
        let err = ChatError::AllModelsFailed("a: 404 nope | b: 422 bad".into());
        let msg = err.to_string();
        assert!(msg.contains("a: 404 nope"));
        assert!(msg.contains("b: 422 bad"));
    }
}
