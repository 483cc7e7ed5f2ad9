use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Response},
};

use crate::auth::{RequestHost, SessionCookie, clear_session_cookie};
use crate::server::AppState;
use crate::server::dto::{SigninParams, SigninUrlParams};
use crate::server::response::{ApiError, ApiResponse, with_session};
use crate::types::ClientInfo;

pub async fn signin(
    State(state): State<Arc<AppState>>,
    SessionCookie(previous): SessionCookie,
    client: ClientInfo,
    Query(params): Query<SigninParams>,
) -> Result<Response, ApiError> {
    let account = state
        .gate
        .sign_in(&params.code, &params.state, previous.as_ref(), &client)
        .await?;

    Ok(with_session(&account, &account.claims))
}

pub async fn signout(
    State(state): State<Arc<AppState>>,
    SessionCookie(handle): SessionCookie,
) -> impl IntoResponse {
    state.gate.sign_out(handle.as_ref());

    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Json(ApiResponse::success(())),
    )
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    SessionCookie(handle): SessionCookie,
    client: ClientInfo,
) -> Result<Response, ApiError> {
    let account = state
        .gate
        .get_account(host.as_deref(), handle.as_ref(), &client)?;

    Ok(with_session(&account, &account.claims))
}

pub async fn signin_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SigninUrlParams>,
) -> impl IntoResponse {
    let url = state
        .gate
        .verifier()
        .sign_in_url(&params.redirect_uri, &params.state);

    Json(ApiResponse::success(url))
}
