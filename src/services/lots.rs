use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{LotChanges, StockLot},
    repository::InventoryStore,
};

#[derive(Debug, Default, Deserialize)]
pub struct LotEditRequest {
    pub lote: Option<String>,
    /// Number or numeric string; forms send either.
    pub cantidad_unidades: Option<Value>,
}

/// Largest value a `NUMERIC(12, 2)` quantity column holds.
pub const MAX_QUANTITY: Decimal = dec!(9999999999.99);

/// Whether `quantity` is stored exactly: at most two decimals and within
/// [`MAX_QUANTITY`].
pub fn fits_quantity_column(quantity: Decimal) -> bool {
    quantity.normalize().scale() <= 2 && quantity.abs() <= MAX_QUANTITY
}

/// Reads a non-negative quantity from a JSON number or numeric string.
pub fn parse_quantity(value: &Value) -> AppResult<Decimal> {
    let parsed = match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    let quantity = parsed.ok_or_else(|| AppError::validation("quantity must be a number"))?;
    if quantity < Decimal::ZERO {
        return Err(AppError::validation("quantity cannot be negative"));
    }
    if !fits_quantity_column(quantity) {
        return Err(AppError::validation(
            "quantity allows at most two decimals and 9999999999.99 units",
        ));
    }
    Ok(quantity.normalize())
}

fn validate_edit(request: &LotEditRequest) -> AppResult<LotChanges> {
    let lote = match request.lote.as_deref().map(str::trim) {
        Some("") => return Err(AppError::validation("lot code cannot be empty")),
        Some(code) => Some(code.to_string()),
        None => None,
    };
    let cantidad_unidades = match &request.cantidad_unidades {
        Some(Value::Null) | None => None,
        Some(value) => Some(parse_quantity(value)?),
    };
    let changes = LotChanges { lote, cantidad_unidades };
    if changes.is_empty() {
        return Err(AppError::validation("nothing to update"));
    }
    Ok(changes)
}

pub async fn edit_lot<S: InventoryStore>(
    store: &S,
    id: Uuid,
    request: &LotEditRequest,
) -> AppResult<StockLot> {
    let changes = validate_edit(request)?;

    let current = store
        .get_lot(id)
        .await?
        .ok_or(AppError::NotFound { entity: "stock lot" })?;
    if let Some(quantity) = changes.cantidad_unidades {
        if quantity < current.cantidad_reservada {
            return Err(AppError::validation(format!(
                "quantity {} is below the reserved quantity {}",
                quantity, current.cantidad_reservada
            )));
        }
    }

    store.update_lot(id, &changes).await
}

/// Deletes unconditionally; a lot that still has reserved units is removed too.
pub async fn delete_lot<S: InventoryStore>(store: &S, id: Uuid) -> AppResult<StockLot> {
    let deleted = store.delete_lot(id).await?;
    if deleted.cantidad_reservada > Decimal::ZERO {
        log::warn!(
            "Deleted stock lot {} with {} reserved units",
            deleted.id,
            deleted.cantidad_reservada
        );
    }
    Ok(deleted)
}
