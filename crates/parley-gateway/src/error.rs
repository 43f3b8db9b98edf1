// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`ParleyError`] to relay HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_core::wire::ErrorBody;
use parley_core::{ErrorKind, ParleyError};

/// A relay failure reported before any response bytes were written.
#[derive(Debug)]
pub struct ApiError(pub ParleyError);

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ModelNotFound | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidUpstreamResponse | ErrorKind::Protocol => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::StreamInFlight => StatusCode::CONFLICT,
        ErrorKind::Upstream
        | ErrorKind::Relay
        | ErrorKind::Config
        | ErrorKind::Storage
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::warn!(kind = %kind, error = %self.0, "relay request failed");
        } else {
            tracing::debug!(kind = %kind, error = %self.0, "relay request rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            details: Some(kind.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        let cases = [
            (
                ParleyError::UpstreamUnavailable { url: "u".into() },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ParleyError::ModelNotFound { model: "m".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                ParleyError::BadRequest { message: "b".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                ParleyError::InvalidUpstreamResponse { message: "i".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ParleyError::UpstreamTimeout {
                    duration: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ParleyError::Protocol { message: "p".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (ParleyError::upstream("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
