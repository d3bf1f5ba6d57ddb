use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Roles allowed to change catalog and stock data.
pub const WRITER_ROLES: [&str; 2] = ["doctor", "logistica"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nombre: String,
    pub rol: String,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub nombre: String,
    pub rol: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            nombre: user.nombre,
            rol: user.rol,
        }
    }
}

pub fn is_writer_role(role: &str) -> bool {
    WRITER_ROLES
        .iter()
        .any(|writer| writer.eq_ignore_ascii_case(role.trim()))
}
