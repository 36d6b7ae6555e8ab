use axum::{extract::FromRequestParts, http::request::Parts};
use db::ordering::{Actor, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller identity as forwarded by the upstream gateway.
pub struct CurrentActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("{name} header is required")))
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|e| ApiError::Unauthorized(format!("{USER_ID_HEADER}: {e}")))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthorized(format!("{USER_ROLE_HEADER}: {e}")))?;
        Ok(CurrentActor(Actor { user_id, role }))
    }
}
