use axum::{
    Json,
    http::{
        HeaderValue, StatusCode,
        header::{SET_COOKIE, WWW_AUTHENTICATE},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::auth::{Account, session_cookie};
use crate::error::Error;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

/// Wraps `data` and hands the client its session cookie when the session is new.
pub fn with_session<T: Serialize>(account: &Account, data: T) -> Response {
    let mut response = Json(ApiResponse::success(data)).into_response();
    if account.new_session {
        if let Some(cookie) = session_cookie(&account.handle) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::MustSignIn | Error::ExchangeFailed(_) | Error::TokenInvalid(_) => {
                Self::unauthorized(message)
            }
            Error::InvalidInput(_) => Self::bad_request(message),
            Error::NotFound => Self::not_found(message),
            Error::AlreadyExists => Self {
                status: StatusCode::CONFLICT,
                message,
            },
            _ => {
                tracing::error!("Request failed: {message}");
                Self::internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "data": null, "error": self.message });
        let mut response = (self.status, Json(body)).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Cookie realm=\"chatgate\""),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::MustSignIn, StatusCode::UNAUTHORIZED),
            (Error::ExchangeFailed("bad code".into()), StatusCode::UNAUTHORIZED),
            (Error::TokenInvalid("expired".into()), StatusCode::UNAUTHORIZED),
            (Error::InvalidInput("empty name".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::AlreadyExists, StatusCode::CONFLICT),
            (
                Error::NoDefaultStore {
                    owner: "admin".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_message_is_error_text() {
        let api = ApiError::from(Error::MustSignIn);
        assert_eq!(api.message, "Please sign in first");

        let response = api.into_response();
        assert!(response.headers().contains_key(WWW_AUTHENTICATE));
    }

    #[test]
    fn test_server_errors_have_no_challenge() {
        let response = ApiError::internal("boom").into_response();
        assert!(!response.headers().contains_key(WWW_AUTHENTICATE));
    }
}
