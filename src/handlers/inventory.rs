use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::Json,
};
use axum_extra::extract::Multipart;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{Brand, NewBrand, NewVariant, StockLot, StockLotListing, Variant},
    repository::InventoryStore,
    services::{
        catalog,
        ingress::{self, Attachment, IngressOutcome, IngressRequest},
        lots::{self, LotEditRequest},
    },
    state::AppState,
};

/// Multipart part carrying the ingress JSON body.
const INGRESS_DATA_FIELD: &str = "data";
/// Multipart part carrying the supplier PDF.
const INGRESS_FILE_FIELD: &str = "documento_pdf";

pub async fn list_brands(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Brand>>> {
    Ok(Json(state.store().list_brands().await?))
}

pub async fn create_brand(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<NewBrand>,
) -> AppResult<(StatusCode, Json<Brand>)> {
    user.require_writer()?;
    let brand = catalog::create_brand(&state.store(), form).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn list_variants(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Variant>>> {
    Ok(Json(state.store().list_variants().await?))
}

pub async fn create_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<NewVariant>,
) -> AppResult<(StatusCode, Json<Variant>)> {
    user.require_writer()?;
    let variant = catalog::create_variant(&state.store(), form).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn list_lots(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<StockLotListing>>> {
    Ok(Json(state.store().list_lots().await?))
}

pub async fn update_lot(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(form): Json<LotEditRequest>,
) -> AppResult<Json<StockLot>> {
    user.require_writer()?;
    let lot = lots::edit_lot(&state.store(), lot_id, &form).await?;
    Ok(Json(lot))
}

pub async fn delete_lot(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<StockLot>> {
    user.require_writer()?;
    let lot = lots::delete_lot(&state.store(), lot_id).await?;
    log::info!("User {} deleted stock lot {}", user.email, lot.id);
    Ok(Json(lot))
}

/// Accepts the ingress either as plain JSON or as multipart with a `data`
/// JSON part and an optional `documento_pdf` file.
pub async fn register_ingress(
    State(state): State<AppState>,
    user: CurrentUser,
    request: Request,
) -> AppResult<(StatusCode, Json<IngressOutcome>)> {
    user.require_writer()?;

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (form, attachment) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;
        parse_ingress_multipart(multipart).await?
    } else {
        let Json(form) = Json::<IngressRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        (form, None)
    };

    let outcome = ingress::register_ingress(
        &state.store(),
        Some(user.id),
        &form,
        attachment.as_ref(),
        &state.config.upload_dir,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn parse_ingress_multipart(
    mut multipart: Multipart,
) -> AppResult<(IngressRequest, Option<Attachment>)> {
    let mut form = None;
    let mut attachment = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.to_string()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        match name.as_str() {
            INGRESS_DATA_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.to_string()))?;
                let parsed: IngressRequest = serde_json::from_str(&text)
                    .map_err(|e| AppError::validation(format!("invalid ingress data: {}", e)))?;
                form = Some(parsed);
            }
            INGRESS_FILE_FIELD => {
                let filename = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.to_string()))?;
                attachment = Some(Attachment { filename, data });
            }
            _ => (),
        }
    }

    let form = form.ok_or_else(|| {
        AppError::validation(format!("multipart field '{}' is required", INGRESS_DATA_FIELD))
    })?;
    Ok((form, attachment))
}
