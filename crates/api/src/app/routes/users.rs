use keystone_auth::User;
use keystone_infra::{RecordStore, StoreError};

use crate::app::AppState;
use crate::app::dto;
use crate::app::errors::{ApiError, Reply};
use crate::app::router::{Resource, Routes};
use crate::app::routes::store_failure;
use crate::context::RequestContext;

pub const COLLECTION: &str = "users";

const UNKNOWN_USER: &str = "The specified user does not exist.";

pub struct UsersResource;

impl Resource<AppState> for UsersResource {
    fn base_path(&self) -> &str {
        COLLECTION
    }

    fn declare(&self, routes: &mut Routes<AppState>) {
        routes
            .get("", get_user)
            .post("", create_user)
            .put("", update_user)
            .delete("", delete_user);
    }
}

/// `GET /users?phone=`
pub async fn get_user(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let phone = dto::required_query(&ctx, "phone")?;

    let user: User = state
        .store
        .read_as(COLLECTION, &phone)
        .await
        .map_err(|e| store_failure(e, ApiError::NotFound, "Could not read the specified user."))?;

    Reply::json(&user.to_public())
}

/// `POST /users` (signup).
///
/// Relies on the store's exclusive create to reject an existing phone, so the
/// stored record is never touched by a duplicate signup.
pub async fn create_user(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let signup = dto::signup(&ctx)?;
    let user = User::register(signup, &state.hasher);

    state
        .store
        .create_as(COLLECTION, &user.phone, &user)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => {
                ApiError::conflict("A user with that phone number already exists.")
            }
            StoreError::InvalidKey(_) => ApiError::missing_fields(),
            other => ApiError::storage("Could not create the new user.", &other),
        })?;

    tracing::info!(phone = %user.phone, "user created");
    Ok(Reply::ok())
}

/// `PUT /users`: partial update of names and/or password.
pub async fn update_user(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let req = dto::user_update(&ctx)?;

    let mut user: User = state
        .store
        .read_as(COLLECTION, &req.phone)
        .await
        .map_err(|e| store_failure(e, ApiError::precondition(UNKNOWN_USER), "Could not read the specified user."))?;

    user.apply(req.changes, &state.hasher)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    state
        .store
        .update_as(COLLECTION, &req.phone, &user)
        .await
        .map_err(|e| store_failure(e, ApiError::precondition(UNKNOWN_USER), "Could not update the user."))?;

    Ok(Reply::ok())
}

/// `DELETE /users?phone=`
pub async fn delete_user(state: AppState, ctx: RequestContext) -> Result<Reply, ApiError> {
    let phone = dto::required_query(&ctx, "phone")?;

    state.store.delete(COLLECTION, &phone).await.map_err(|e| {
        store_failure(
            e,
            ApiError::precondition("Could not find the specified user."),
            "Could not delete the specified user.",
        )
    })?;

    tracing::info!(phone = %phone, "user deleted");
    Ok(Reply::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::errors::IntoReply;
    use crate::app::router::Method;
    use axum::http::StatusCode;
    use keystone_core::PasswordHasher;
    use keystone_infra::InMemoryStore;
    use serde_json::{Value as JsonValue, json};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(InMemoryStore::new()), PasswordHasher::new("test-secret"))
    }

    fn body(payload: JsonValue) -> RequestContext {
        RequestContext::new(Method::Post, COLLECTION).with_payload(payload)
    }

    fn query(phone: &str) -> RequestContext {
        RequestContext::new(Method::Get, COLLECTION).with_query_param("phone", phone)
    }

    fn signup_payload() -> JsonValue {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phone": "5551234567",
            "password": "engine",
            "tosAgreement": true
        })
    }

    async fn stored(state: &AppState, phone: &str) -> JsonValue {
        state.store.read(COLLECTION, phone).await.unwrap()
    }

    #[tokio::test]
    async fn signup_persists_hashed_user() {
        let state = state();
        let reply = create_user(state.clone(), body(signup_payload())).await.into_reply();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.rendered_body(), json!({}));

        let record = stored(&state, "5551234567").await;
        assert_eq!(record["firstName"], "Ada");
        assert_eq!(record["tosAgreement"], true);
        assert_ne!(record["hashedPassword"], "engine");
        assert!(record.get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected_without_mutation() {
        let state = state();
        create_user(state.clone(), body(signup_payload())).await.unwrap();
        let before = stored(&state, "5551234567").await;

        let mut again = signup_payload();
        again["firstName"] = json!("Eve");
        again["password"] = json!("other");
        let err = create_user(state.clone(), body(again)).await.unwrap_err();

        assert_eq!(err, ApiError::conflict("A user with that phone number already exists."));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stored(&state, "5551234567").await, before);
    }

    #[tokio::test]
    async fn signup_without_terms_is_rejected() {
        let mut payload = signup_payload();
        payload["tosAgreement"] = json!(false);
        let err = create_user(state(), body(payload)).await.unwrap_err();
        assert_eq!(err, ApiError::missing_fields());
    }

    #[tokio::test]
    async fn get_strips_password_hash() {
        let state = state();
        create_user(state.clone(), body(signup_payload())).await.unwrap();

        let reply = get_user(state, query("5551234567")).await.unwrap();
        let user = reply.rendered_body();
        assert_eq!(user["phone"], "5551234567");
        assert_eq!(user["lastName"], "Lovelace");
        assert!(user.get("hashedPassword").is_none());
    }

    #[tokio::test]
    async fn get_unknown_or_missing_phone() {
        let state = state();
        assert_eq!(
            get_user(state.clone(), query("000")).await.unwrap_err(),
            ApiError::NotFound
        );
        assert_eq!(
            get_user(state, RequestContext::new(Method::Get, COLLECTION))
                .await
                .unwrap_err(),
            ApiError::missing_fields()
        );
    }

    #[tokio::test]
    async fn update_changes_given_fields_and_rehashes_password() {
        let state = state();
        create_user(state.clone(), body(signup_payload())).await.unwrap();
        let before = stored(&state, "5551234567").await;

        update_user(
            state.clone(),
            body(json!({ "phone": "5551234567", "lastName": "Byron", "password": "loom" })),
        )
        .await
        .unwrap();

        let after = stored(&state, "5551234567").await;
        assert_eq!(after["firstName"], "Ada");
        assert_eq!(after["lastName"], "Byron");
        assert_ne!(after["hashedPassword"], before["hashedPassword"]);
    }

    #[tokio::test]
    async fn update_unknown_user_is_a_bad_request() {
        let err = update_user(state(), body(json!({ "phone": "000", "firstName": "X" })))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::precondition(UNKNOWN_USER));
    }

    #[tokio::test]
    async fn delete_removes_user_and_rejects_unknown() {
        let state = state();
        create_user(state.clone(), body(signup_payload())).await.unwrap();

        delete_user(state.clone(), query("5551234567")).await.unwrap();
        assert!(state.store.read(COLLECTION, "5551234567").await.is_err());

        let err = delete_user(state, query("5551234567")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn traversal_phone_is_treated_as_missing() {
        let err = get_user(state(), query("../tokens/x")).await.unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }
}
