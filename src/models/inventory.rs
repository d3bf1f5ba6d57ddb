use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Top-level product family (e.g. "Juvederm").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub nombre: String,
    pub categoria: Option<String>,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBrand {
    pub nombre: String,
    pub categoria: Option<String>,
    pub descripcion: Option<String>,
}

/// A sellable/usable formulation within a brand, joined with its brand name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Variant {
    pub id: Uuid,
    pub producto_base_id: Uuid,
    pub producto_base_nombre: String,
    pub nombre: String,
    pub laboratorio: Option<String>,
    pub unidad_base: String,
    pub contenido_por_presentacion: Option<Decimal>,
    pub es_medico: bool,
    pub stock_minimo_unidades: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub producto_base_id: Uuid,
    pub nombre: String,
    pub laboratorio: Option<String>,
    pub unidad_base: Option<String>,
    pub contenido_por_presentacion: Option<Decimal>,
    #[serde(default)]
    pub es_medico: bool,
    pub stock_minimo_unidades: Option<Decimal>,
}

/// One received batch of a variant, as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockLot {
    pub id: Uuid,
    pub variante_id: Uuid,
    pub lote: Option<String>,
    pub cantidad_unidades: Decimal,
    pub cantidad_reservada: Decimal,
    pub ubicacion: Option<String>,
    pub fecha_ingreso: DateTime<Utc>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub documento_id: Option<Uuid>,
}

impl StockLot {
    /// Quantity that can still be used: on hand minus reserved, never negative.
    pub fn available(&self) -> Decimal {
        (self.cantidad_unidades - self.cantidad_reservada).max(Decimal::ZERO)
    }
}

/// Lot row joined with the display names of its variant and brand. The names
/// are optional because the variant may have vanished from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockLotListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lot: StockLot,
    pub producto_base_nombre: Option<String>,
    pub variante_nombre: Option<String>,
    pub laboratorio: Option<String>,
    pub unidad_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStockLot {
    pub variante_id: Uuid,
    pub lote: String,
    pub cantidad_unidades: Decimal,
    pub cantidad_reservada: Decimal,
    pub ubicacion: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub documento_id: Option<Uuid>,
}

/// Validated in-place edit of a lot. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct LotChanges {
    pub lote: Option<String>,
    pub cantidad_unidades: Option<Decimal>,
}

impl LotChanges {
    pub fn is_empty(&self) -> bool {
        self.lote.is_none() && self.cantidad_unidades.is_none()
    }
}

/// Supplier paperwork attached to one ingress call.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IngressDocument {
    pub id: Uuid,
    pub proveedor: Option<String>,
    pub documento: Option<String>,
    pub observacion: Option<String>,
    pub archivo_url: Option<String>,
    pub creado_por: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewIngressDocument {
    pub proveedor: Option<String>,
    pub documento: Option<String>,
    pub observacion: Option<String>,
    pub archivo_url: Option<String>,
    pub creado_por: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    // Declaration order is the report order.
    Emergency,
    Ok,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Emergency => "EMERGENCY",
            StockStatus::Ok => "OK",
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, StockStatus::Emergency)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant availability, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityRow {
    pub variante_id: Uuid,
    pub producto_base: String,
    pub variante: String,
    pub unidad: String,
    pub laboratorio: String,
    /// Effective minimum, already floored.
    pub stock_minimo: Decimal,
    pub disponible: Decimal,
    pub estado: StockStatus,
}
