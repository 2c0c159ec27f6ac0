use keystone_auth::{Signup, UserUpdate};

use crate::app::errors::ApiError;
use crate::context::RequestContext;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendTokenRequest {
    pub id: String,
}

/// `PUT /users`: the target phone plus the fields to change.
#[derive(Debug, Clone)]
pub struct UpdateUserRequest {
    pub phone: String,
    pub changes: UserUpdate,
}

// -------------------------
// Extraction
// -------------------------

/// A required, non-empty query parameter.
pub fn required_query(ctx: &RequestContext, name: &str) -> Result<String, ApiError> {
    ctx.query_str(name).ok_or_else(ApiError::missing_fields)
}

fn required_field(ctx: &RequestContext, name: &str) -> Result<String, ApiError> {
    ctx.payload_str(name).ok_or_else(ApiError::missing_fields)
}

pub fn signup(ctx: &RequestContext) -> Result<Signup, ApiError> {
    let signup = Signup {
        first_name: required_field(ctx, "firstName")?,
        last_name: required_field(ctx, "lastName")?,
        phone: required_field(ctx, "phone")?,
        password: required_field(ctx, "password")?,
    };
    if !ctx.payload_flag("tosAgreement") {
        return Err(ApiError::missing_fields());
    }
    Ok(signup)
}

pub fn user_update(ctx: &RequestContext) -> Result<UpdateUserRequest, ApiError> {
    let phone = required_field(ctx, "phone")?;
    let changes = UserUpdate {
        first_name: ctx.payload_str("firstName"),
        last_name: ctx.payload_str("lastName"),
        password: ctx.payload_str("password"),
    };
    if changes.is_empty() {
        return Err(ApiError::validation("Missing fields to update."));
    }
    Ok(UpdateUserRequest { phone, changes })
}

pub fn login(ctx: &RequestContext) -> Result<LoginRequest, ApiError> {
    Ok(LoginRequest {
        phone: required_field(ctx, "phone")?,
        password: required_field(ctx, "password")?,
    })
}

pub fn token_extension(ctx: &RequestContext) -> Result<ExtendTokenRequest, ApiError> {
    let id = required_field(ctx, "id")?;
    if !ctx.payload_flag("extend") {
        return Err(ApiError::validation(
            "Missing required field(s) or field(s) are invalid.",
        ));
    }
    Ok(ExtendTokenRequest { id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::router::Method;
    use serde_json::json;

    fn post(payload: serde_json::Value) -> RequestContext {
        RequestContext::new(Method::Post, "users").with_payload(payload)
    }

    #[test]
    fn signup_requires_every_field_and_terms() {
        let full = json!({
            "firstName": " Ada ", "lastName": "Lovelace",
            "phone": "555", "password": "pw", "tosAgreement": true
        });
        let signup = signup(&post(full.clone())).unwrap();
        assert_eq!(signup.first_name, "Ada");
        assert_eq!(signup.phone, "555");

        for field in ["firstName", "lastName", "phone", "password", "tosAgreement"] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(field);
            assert_eq!(
                super::signup(&post(partial)).unwrap_err(),
                ApiError::missing_fields(),
                "{field}"
            );
        }

        let mut declined = full;
        declined["tosAgreement"] = json!(false);
        assert!(super::signup(&post(declined)).is_err());
    }

    #[test]
    fn update_needs_phone_and_one_change() {
        let err = user_update(&post(json!({ "firstName": "A" }))).unwrap_err();
        assert_eq!(err, ApiError::missing_fields());

        let err = user_update(&post(json!({ "phone": "555" }))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let req = user_update(&post(json!({ "phone": "555", "password": "new" }))).unwrap();
        assert_eq!(req.changes.password.as_deref(), Some("new"));
        assert!(req.changes.first_name.is_none());
    }

    #[test]
    fn extension_requires_truthy_extend() {
        assert!(token_extension(&post(json!({ "id": "abc", "extend": true }))).is_ok());
        assert!(token_extension(&post(json!({ "id": "abc", "extend": 0 }))).is_err());
        assert!(token_extension(&post(json!({ "extend": true }))).is_err());
    }

    #[test]
    fn query_must_be_present() {
        let ctx = RequestContext::new(Method::Get, "users");
        assert_eq!(required_query(&ctx, "phone").unwrap_err(), ApiError::missing_fields());
    }
}
