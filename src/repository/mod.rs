//! Data access for the inventory tables.
//!
//! Services are written against [`InventoryStore`] so the aggregation and
//! ingress rules can be exercised without a running Postgres.

mod postgres;
#[cfg(test)]
pub mod memory;

use std::future::Future;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Brand, IngressDocument, LotChanges, NewBrand, NewIngressDocument, NewStockLot, NewVariant,
    StockLot, StockLotListing, Variant,
};

pub use postgres::PgInventoryStore;

/// Unit assigned to variants created implicitly by ingress.
pub const DEFAULT_UNIT: &str = "U";

pub trait InventoryStore: Send + Sync {
    fn list_brands(&self) -> impl Future<Output = AppResult<Vec<Brand>>> + Send;

    /// Fails with `Conflict` when a brand with the same name (ignoring case) exists.
    fn create_brand(&self, input: &NewBrand) -> impl Future<Output = AppResult<Brand>> + Send;

    /// Insert-or-return-existing on the case-insensitive brand name.
    fn ensure_brand(&self, nombre: &str) -> impl Future<Output = AppResult<Uuid>> + Send;

    fn list_variants(&self) -> impl Future<Output = AppResult<Vec<Variant>>> + Send;

    fn get_variant(&self, id: Uuid) -> impl Future<Output = AppResult<Option<Variant>>> + Send;

    fn create_variant(&self, input: &NewVariant)
        -> impl Future<Output = AppResult<Variant>> + Send;

    /// Insert-or-return-existing on `(brand, name, laboratory)`, ignoring case.
    /// New rows get unit [`DEFAULT_UNIT`] and the stock floor as minimum.
    fn ensure_variant(
        &self,
        brand_id: Uuid,
        nombre: &str,
        laboratorio: Option<&str>,
    ) -> impl Future<Output = AppResult<Uuid>> + Send;

    fn list_lots(&self) -> impl Future<Output = AppResult<Vec<StockLotListing>>> + Send;

    fn get_lot(&self, id: Uuid) -> impl Future<Output = AppResult<Option<StockLot>>> + Send;

    fn insert_lot(&self, lot: &NewStockLot) -> impl Future<Output = AppResult<StockLot>> + Send;

    fn update_lot(
        &self,
        id: Uuid,
        changes: &LotChanges,
    ) -> impl Future<Output = AppResult<StockLot>> + Send;

    /// Returns the removed row.
    fn delete_lot(&self, id: Uuid) -> impl Future<Output = AppResult<StockLot>> + Send;

    fn create_ingress_document(
        &self,
        document: &NewIngressDocument,
    ) -> impl Future<Output = AppResult<IngressDocument>> + Send;
}
