//! Role checks layered on [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use klyra_core::error::CoreError;
use klyra_core::roles::{ROLE_ADMIN, ROLE_SENSOR};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires the `sensor` or `admin` role.
pub struct RequireSensor(pub AuthUser);

impl FromRequestParts<AppState> for RequireSensor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_SENSOR && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Sensor or Admin role required".into(),
            )));
        }
        Ok(RequireSensor(user))
    }
}
