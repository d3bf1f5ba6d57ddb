use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Brand, NewBrand, NewVariant, Variant},
    repository::InventoryStore,
    services::lots::fits_quantity_column,
};

fn clean(value: &str) -> &str {
    value.trim()
}

fn clean_optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn as_catalog_error(err: AppError) -> AppError {
    match err {
        AppError::Database(cause) => AppError::Catalog(cause.to_string()),
        other => other,
    }
}

/// Resolves `brand / variant / laboratory` to a variant id, creating the
/// brand and the variant when they do not exist yet. Names compare trimmed
/// and case-insensitively. A brand created here stays even if the variant
/// insert then fails.
pub async fn ensure_variant<S: InventoryStore>(
    store: &S,
    brand: &str,
    variant: &str,
    laboratory: Option<&str>,
) -> AppResult<Uuid> {
    let brand = clean(brand);
    let variant = clean(variant);
    if brand.is_empty() || variant.is_empty() {
        return Err(AppError::validation("brand and variant names are required"));
    }
    let laboratory = clean_optional(laboratory);

    let brand_id = store.ensure_brand(brand).await.map_err(as_catalog_error)?;
    store
        .ensure_variant(brand_id, variant, laboratory)
        .await
        .map_err(as_catalog_error)
}

pub async fn create_brand<S: InventoryStore>(store: &S, mut input: NewBrand) -> AppResult<Brand> {
    input.nombre = clean(&input.nombre).to_string();
    if input.nombre.is_empty() {
        return Err(AppError::validation("brand name is required"));
    }
    input.categoria = clean_optional(input.categoria.as_deref()).map(str::to_string);
    input.descripcion = clean_optional(input.descripcion.as_deref()).map(str::to_string);
    store.create_brand(&input).await
}

pub async fn create_variant<S: InventoryStore>(
    store: &S,
    mut input: NewVariant,
) -> AppResult<Variant> {
    input.nombre = clean(&input.nombre).to_string();
    if input.nombre.is_empty() {
        return Err(AppError::validation("variant name is required"));
    }
    if input.stock_minimo_unidades.is_some_and(|m| m < Decimal::ZERO) {
        return Err(AppError::validation("minimum stock cannot be negative"));
    }
    if input.contenido_por_presentacion.is_some_and(|c| c < Decimal::ZERO) {
        return Err(AppError::validation("content per presentation cannot be negative"));
    }
    let amounts = [input.stock_minimo_unidades, input.contenido_por_presentacion];
    if amounts.into_iter().flatten().any(|q| !fits_quantity_column(q)) {
        return Err(AppError::validation(
            "quantities allow at most two decimals and 9999999999.99 units",
        ));
    }
    input.laboratorio = clean_optional(input.laboratorio.as_deref()).map(str::to_string);
    input.unidad_base = clean_optional(input.unidad_base.as_deref()).map(str::to_string);
    store.create_variant(&input).await
}
