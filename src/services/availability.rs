//! Per-variant stock availability and low-stock classification.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::models::{AvailabilityRow, StockLotListing, StockStatus, Variant};

/// No variant is considered healthy below this many units, whatever its
/// configured minimum says.
pub const MIN_STOCK_FLOOR: Decimal = dec!(3);

pub fn effective_minimum(configured: Option<Decimal>) -> Decimal {
    configured.unwrap_or(Decimal::ZERO).max(MIN_STOCK_FLOOR)
}

pub fn classify(available: Decimal, minimum: Decimal) -> StockStatus {
    if available < minimum {
        StockStatus::Emergency
    } else {
        StockStatus::Ok
    }
}

/// Builds one row per variant: every variant referenced by a lot plus every
/// catalog variant without lots. Catalog metadata wins over the names carried
/// on the lot rows; a lot whose variant is missing from the catalog keeps its
/// own (possibly blank) names.
pub fn compute_availability(
    lots: &[StockLotListing],
    variants: &[Variant],
) -> HashMap<Uuid, AvailabilityRow> {
    let mut rows: HashMap<Uuid, AvailabilityRow> = HashMap::new();
    let mut configured: HashMap<Uuid, Option<Decimal>> = HashMap::new();

    for listing in lots {
        let row = rows
            .entry(listing.lot.variante_id)
            .or_insert_with(|| AvailabilityRow {
                variante_id: listing.lot.variante_id,
                producto_base: listing.producto_base_nombre.clone().unwrap_or_default(),
                variante: listing.variante_nombre.clone().unwrap_or_default(),
                unidad: listing.unidad_base.clone().unwrap_or_default(),
                laboratorio: listing.laboratorio.clone().unwrap_or_default(),
                stock_minimo: MIN_STOCK_FLOOR,
                disponible: Decimal::ZERO,
                estado: StockStatus::Ok,
            });
        row.disponible += listing.lot.available();
    }

    for variant in variants {
        let row = rows.entry(variant.id).or_insert_with(|| AvailabilityRow {
            variante_id: variant.id,
            producto_base: String::new(),
            variante: String::new(),
            unidad: String::new(),
            laboratorio: String::new(),
            stock_minimo: MIN_STOCK_FLOOR,
            disponible: Decimal::ZERO,
            estado: StockStatus::Ok,
        });
        row.producto_base = variant.producto_base_nombre.clone();
        row.variante = variant.nombre.clone();
        row.unidad = variant.unidad_base.clone();
        row.laboratorio = variant.laboratorio.clone().unwrap_or_default();
        configured.insert(variant.id, variant.stock_minimo_unidades);
    }

    for row in rows.values_mut() {
        row.stock_minimo = effective_minimum(configured.get(&row.variante_id).copied().flatten());
        row.estado = classify(row.disponible, row.stock_minimo);
    }

    rows
}
