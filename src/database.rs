use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::{AdminSeed, Config},
    error::{AppError, AppResult},
    utils::hash_password,
};

pub type Database = Pool<Postgres>;

pub async fn create_database_pool(config: &Config) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!("Connected to database successfully");
    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations applied");
    Ok(())
}

/// Creates the configured initial account unless its email is already taken.
pub async fn ensure_admin_user(pool: &Database, seed: &AdminSeed) -> AppResult<()> {
    let password_hash = hash_password(&seed.password)
        .map_err(|e| AppError::Internal(format!("could not hash admin password: {}", e)))?;

    let created = sqlx::query(
        r#"
        INSERT INTO usuarios (email, password_hash, nombre, rol)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&seed.email)
    .bind(password_hash)
    .bind("Administrador")
    .bind(&seed.rol)
    .execute(pool)
    .await?
    .rows_affected();

    if created > 0 {
        log::info!("Created initial user {} ({})", seed.email, seed.rol);
    }
    Ok(())
}
