use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use partyjam_core::PartyError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub type ServerResult<T> = Result<T, ServerError>;

/// The body every failed request resolves to
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ServerError(#[from] PartyError);

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self.0 {
            PartyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PartyError::PartyNotFound
            | PartyError::MemberNotFound
            | PartyError::TrackNotFound
            | PartyError::JoinCodeNotFound => StatusCode::NOT_FOUND,
            PartyError::NotHost
            | PartyError::SuggestionsDisabled
            | PartyError::ExplicitContentBlocked => StatusCode::FORBIDDEN,
            PartyError::InvalidState(_) | PartyError::PartyNotLive => StatusCode::BAD_REQUEST,
            PartyError::DuplicateTrack => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };

        (self.as_status_code(), Json(body)).into_response()
    }
}
