use keystone_infra::StoreError;

use crate::app::errors::ApiError;

pub mod tokens;
pub mod users;

/// Map a store failure onto the handler error space.
///
/// A missing (or unaddressable) record becomes `missing`; anything else is a
/// 500 carrying `failure` as its message.
pub(crate) fn store_failure(err: StoreError, missing: ApiError, failure: &str) -> ApiError {
    match err {
        StoreError::NotFound { .. } | StoreError::InvalidKey(_) => missing,
        other => ApiError::storage(failure, &other),
    }
}
