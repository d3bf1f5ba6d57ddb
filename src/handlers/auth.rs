use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use tower_cookies::{Cookie, Cookies};

use crate::{
    database::Database,
    error::{AppError, AppResult},
    middleware::{CurrentUser, AUTH_COOKIE},
    models::{LoginRequest, User, UserResponse},
    state::AppState,
    utils::{create_token, verify_password, Claims, SESSION_HOURS},
};

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = authenticate_user(&state.db, &form.email, &form.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let claims = Claims::new(user.id, user.email.clone(), user.rol.clone());
    let token = create_token(&state.config.jwt_secret, &claims)
        .map_err(|e| AppError::Internal(format!("could not sign session token: {}", e)))?;

    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build();
    cookies.add(cookie);

    log::info!("User {} signed in as {}", user.email, user.rol);
    Ok(Json(LoginResponse {
        token,
        usuario: user.into(),
    }))
}

pub async fn logout(cookies: Cookies) -> StatusCode {
    cookies.remove(Cookie::build(AUTH_COOKIE).path("/").build());
    StatusCode::NO_CONTENT
}

pub async fn me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}

async fn authenticate_user(
    db: &Database,
    email: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM usuarios WHERE lower(email) = lower($1) AND activo = true",
    )
    .bind(email.trim())
    .fetch_optional(db)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };
    if verify_password(password, &user.password_hash).unwrap_or(false) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
