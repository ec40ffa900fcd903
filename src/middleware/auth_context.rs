use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::error::ApiError;
use crate::models::{AppState, Role};

/// Caller identity taken from a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::admin_required())
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::not_authenticated())?;

            let claims = state.tokens.validate(authz.token()).map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                ApiError::from(e)
            })?;

            Ok(AuthContext {
                user_id: claims.user_id,
                role: claims.role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_passes_admin_guard() {
        let admin = AuthContext { user_id: 1, role: Role::Admin };
        let patient = AuthContext { user_id: 2, role: Role::Patient };
        assert!(admin.ensure_admin().is_ok());
        assert!(matches!(patient.ensure_admin(), Err(ApiError::Forbidden(..))));
    }
}
