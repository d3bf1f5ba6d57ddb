use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::is_writer_role,
    state::AppState,
    utils::{verify_token, Claims},
};

pub const AUTH_COOKIE: &str = "auth_token";

/// The caller of the current request, resolved from the `auth_token` cookie
/// or an `Authorization: Bearer` header. Handlers take it as an argument
/// instead of reading cookies themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub rol: String,
}

impl CurrentUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            id,
            email: claims.email,
            rol: claims.rol,
        })
    }

    pub fn can_write(&self) -> bool {
        is_writer_role(&self.rol)
    }

    /// Catalog and stock changes are limited to doctors and logistics staff.
    pub fn require_writer(&self) -> AppResult<()> {
        if self.can_write() {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                role: self.rol.clone(),
            })
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers) {
            Some(token) => token,
            None => {
                let cookies = Cookies::from_request_parts(parts, state)
                    .await
                    .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;
                cookies
                    .get(AUTH_COOKIE)
                    .map(|c| c.value().to_string())
                    .ok_or(AppError::Unauthorized)?
            }
        };

        let claims = verify_token(&state.config.jwt_secret, &token).map_err(|e| {
            log::debug!("Rejected session token: {}", e);
            AppError::Unauthorized
        })?;

        CurrentUser::from_claims(claims).ok_or(AppError::Unauthorized)
    }
}
