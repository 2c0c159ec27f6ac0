use std::sync::Arc;

use chrono::{DateTime, Utc};

use keystone_auth::{Token, User};
use keystone_infra::RecordStore;

use crate::app::AppState;
use crate::app::dto;
use crate::app::errors::{ApiError, Reply};
use crate::app::router::{Resource, Routes};
use crate::app::routes::{store_failure, users};
use crate::context::RequestContext;

pub const COLLECTION: &str = "tokens";

const UNKNOWN_TOKEN: &str = "The specified token does not exist.";

pub struct TokensResource;

impl Resource<AppState> for TokensResource {
    fn base_path(&self) -> &str {
        COLLECTION
    }

    fn declare(&self, routes: &mut Routes<AppState>) {
        routes
            .post("", create_token)
            .get("", get_token)
            .put("", extend_token)
            .delete("", delete_token);
    }
}

/// `POST /tokens` (login): exchange phone + password for a fresh token.
pub async fn create_token(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let login = dto::login(&ctx)?;

    let user: User = state
        .store
        .read_as(users::COLLECTION, &login.phone)
        .await
        .map_err(|e| {
            store_failure(
                e,
                ApiError::precondition("A user with that phone number does not exist."),
                "Could not read the specified user.",
            )
        })?;

    if !user.verify_password(&login.password, &state.hasher) {
        return Err(ApiError::validation("User phone and/or password is not correct."));
    }

    let token = Token::issue(user.phone, Utc::now());
    state
        .store
        .create_as(COLLECTION, token.id.as_str(), &token)
        .await
        .map_err(|e| ApiError::storage("Could not create the new token.", &e))?;

    tracing::info!(phone = %token.phone, "token issued");
    Reply::json(&token)
}

/// `GET /tokens?id=`
pub async fn get_token(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let id = dto::required_query(&ctx, "id")?;

    let token: Token = state
        .store
        .read_as(COLLECTION, &id)
        .await
        .map_err(|e| store_failure(e, ApiError::NotFound, "Could not read the specified token."))?;

    Reply::json(&token)
}

/// `PUT /tokens`: push a live token's expiry one hour past now.
pub async fn extend_token(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let req = dto::token_extension(&ctx)?;

    let mut token: Token = state
        .store
        .read_as(COLLECTION, &req.id)
        .await
        .map_err(|e| store_failure(e, ApiError::precondition(UNKNOWN_TOKEN), "Could not read the specified token."))?;

    token
        .extend(Utc::now())
        .map_err(|e| ApiError::validation(e.to_string()))?;

    state
        .store
        .update_as(COLLECTION, &req.id, &token)
        .await
        .map_err(|e| {
            store_failure(
                e,
                ApiError::precondition(UNKNOWN_TOKEN),
                "Could not update the token's expiration.",
            )
        })?;

    Ok(Reply::ok())
}

/// `DELETE /tokens?id=`
pub async fn delete_token(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let id = dto::required_query(&ctx, "id")?;

    state.store.delete(COLLECTION, &id).await.map_err(|e| {
        store_failure(
            e,
            ApiError::precondition("Could not find the specified token."),
            "Could not delete the specified token.",
        )
    })?;

    Ok(Reply::ok())
}

/// True only if token `id` exists, belongs to `phone` and has not expired at
/// `now`. Any storage problem counts as "not verified".
pub async fn verify_token(store: &Arc<dyn RecordStore>, id: &str, phone: &str, now: DateTime<Utc>) -> bool {
    match store.read_as::<Token>(COLLECTION, id).await {
        Ok(token) => token.authorizes(phone, now),
        Err(e) => {
            if !e.is_not_found() {
                tracing::warn!(error = %e, "token lookup failed during verification");
            }
            false
        }
    }
}
