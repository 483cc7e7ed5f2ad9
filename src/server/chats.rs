use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
};

use crate::auth::{RequestHost, SessionCookie};
use crate::server::AppState;
use crate::server::dto::GetMessagesParams;
use crate::server::response::{ApiError, with_session};
use crate::types::ClientInfo;

pub async fn get_chats(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    SessionCookie(handle): SessionCookie,
    client: ClientInfo,
) -> Result<Response, ApiError> {
    let account = state
        .gate
        .get_account(host.as_deref(), handle.as_ref(), &client)?;

    let chats = state
        .store
        .list_conversations_by_member(state.gate.tenant(), &account.claims.principal.qualified_name())?;

    Ok(with_session(&account, chats))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    SessionCookie(handle): SessionCookie,
    client: ClientInfo,
    Query(params): Query<GetMessagesParams>,
) -> Result<Response, ApiError> {
    let account = state
        .gate
        .get_account(host.as_deref(), handle.as_ref(), &client)?;
    let tenant = state.gate.tenant();

    // Someone else's conversation is indistinguishable from a missing one.
    let chat = state
        .store
        .get_conversation(tenant, &params.chat)?
        .filter(|chat| chat.belongs_to(&account.claims.principal))
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;

    let messages = state.store.list_messages(tenant, &chat.name)?;
    Ok(with_session(&account, messages))
}
