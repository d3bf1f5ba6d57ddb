use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{InventoryStore, DEFAULT_UNIT};
use crate::{
    error::{AppError, AppResult},
    models::{
        Brand, IngressDocument, LotChanges, NewBrand, NewIngressDocument, NewStockLot,
        NewVariant, StockLot, StockLotListing, Variant,
    },
    services::availability::MIN_STOCK_FLOOR,
};

#[derive(Default)]
struct Tables {
    brands: Vec<Brand>,
    variants: Vec<Variant>,
    lots: Vec<StockLot>,
    documents: Vec<IngressDocument>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_variant_inserts: AtomicBool,
    fail_document_inserts: AtomicBool,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn same_lab(a: Option<&str>, b: Option<&str>) -> bool {
    same_name(a.unwrap_or(""), b.unwrap_or(""))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent variant insert fail like a lost connection.
    pub fn fail_variant_inserts(&self) {
        self.fail_variant_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_document_inserts(&self) {
        self.fail_document_inserts.store(true, Ordering::SeqCst);
    }

    pub fn brand_count(&self) -> usize {
        self.tables.lock().unwrap().brands.len()
    }

    pub fn variant_count(&self) -> usize {
        self.tables.lock().unwrap().variants.len()
    }

    pub fn lot_count(&self) -> usize {
        self.tables.lock().unwrap().lots.len()
    }

    pub fn document_count(&self) -> usize {
        self.tables.lock().unwrap().documents.len()
    }

    /// Sets the reserved quantity directly; no write path in the service does this.
    pub fn reserve(&self, lot_id: Uuid, quantity: Decimal) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(lot) = tables.lots.iter_mut().find(|l| l.id == lot_id) {
            lot.cantidad_reservada = quantity;
        }
    }

    fn insert_variant_row(tables: &mut Tables, input: &NewVariant) -> AppResult<Variant> {
        let brand = tables
            .brands
            .iter()
            .find(|b| b.id == input.producto_base_id)
            .ok_or(AppError::NotFound { entity: "brand" })?;
        let duplicate = tables.variants.iter().any(|v| {
            v.producto_base_id == input.producto_base_id
                && same_name(&v.nombre, &input.nombre)
                && same_lab(v.laboratorio.as_deref(), input.laboratorio.as_deref())
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "variant '{}' already exists for this brand",
                input.nombre.trim()
            )));
        }
        let variant = Variant {
            id: Uuid::new_v4(),
            producto_base_id: brand.id,
            producto_base_nombre: brand.nombre.clone(),
            nombre: input.nombre.trim().to_string(),
            laboratorio: input.laboratorio.as_deref().map(|l| l.trim().to_string()),
            unidad_base: input
                .unidad_base
                .clone()
                .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            contenido_por_presentacion: input.contenido_por_presentacion,
            es_medico: input.es_medico,
            stock_minimo_unidades: input.stock_minimo_unidades,
            created_at: Utc::now(),
        };
        tables.variants.push(variant.clone());
        Ok(variant)
    }
}

impl InventoryStore for MemoryStore {
    async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        Ok(self.tables.lock().unwrap().brands.clone())
    }

    async fn create_brand(&self, input: &NewBrand) -> AppResult<Brand> {
        let mut tables = self.tables.lock().unwrap();
        if tables.brands.iter().any(|b| same_name(&b.nombre, &input.nombre)) {
            return Err(AppError::Conflict(format!(
                "brand '{}' already exists",
                input.nombre.trim()
            )));
        }
        let brand = Brand {
            id: Uuid::new_v4(),
            nombre: input.nombre.trim().to_string(),
            categoria: input.categoria.clone(),
            descripcion: input.descripcion.clone(),
            created_at: Utc::now(),
        };
        tables.brands.push(brand.clone());
        Ok(brand)
    }

    async fn ensure_brand(&self, nombre: &str) -> AppResult<Uuid> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.brands.iter().find(|b| same_name(&b.nombre, nombre)) {
            return Ok(existing.id);
        }
        let id = Uuid::new_v4();
        tables.brands.push(Brand {
            id,
            nombre: nombre.to_string(),
            categoria: None,
            descripcion: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_variants(&self) -> AppResult<Vec<Variant>> {
        Ok(self.tables.lock().unwrap().variants.clone())
    }

    async fn get_variant(&self, id: Uuid) -> AppResult<Option<Variant>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.variants.iter().find(|v| v.id == id).cloned())
    }

    async fn create_variant(&self, input: &NewVariant) -> AppResult<Variant> {
        let mut tables = self.tables.lock().unwrap();
        Self::insert_variant_row(&mut tables, input)
    }

    async fn ensure_variant(
        &self,
        brand_id: Uuid,
        nombre: &str,
        laboratorio: Option<&str>,
    ) -> AppResult<Uuid> {
        if self.fail_variant_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        let existing = tables.variants.iter().find(|v| {
            v.producto_base_id == brand_id
                && same_name(&v.nombre, nombre)
                && same_lab(v.laboratorio.as_deref(), laboratorio)
        });
        if let Some(variant) = existing {
            return Ok(variant.id);
        }
        let input = NewVariant {
            producto_base_id: brand_id,
            nombre: nombre.to_string(),
            laboratorio: laboratorio.map(str::to_string),
            unidad_base: Some(DEFAULT_UNIT.to_string()),
            contenido_por_presentacion: None,
            es_medico: false,
            stock_minimo_unidades: Some(MIN_STOCK_FLOOR),
        };
        Self::insert_variant_row(&mut tables, &input).map(|v| v.id)
    }

    async fn list_lots(&self) -> AppResult<Vec<StockLotListing>> {
        let tables = self.tables.lock().unwrap();
        let listings = tables
            .lots
            .iter()
            .map(|lot| {
                let variant = tables.variants.iter().find(|v| v.id == lot.variante_id);
                StockLotListing {
                    lot: lot.clone(),
                    producto_base_nombre: variant.map(|v| v.producto_base_nombre.clone()),
                    variante_nombre: variant.map(|v| v.nombre.clone()),
                    laboratorio: variant.and_then(|v| v.laboratorio.clone()),
                    unidad_base: variant.map(|v| v.unidad_base.clone()),
                }
            })
            .collect();
        Ok(listings)
    }

    async fn get_lot(&self, id: Uuid) -> AppResult<Option<StockLot>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.lots.iter().find(|l| l.id == id).cloned())
    }

    async fn insert_lot(&self, lot: &NewStockLot) -> AppResult<StockLot> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.variants.iter().any(|v| v.id == lot.variante_id) {
            return Err(AppError::NotFound { entity: "variant" });
        }
        let row = StockLot {
            id: Uuid::new_v4(),
            variante_id: lot.variante_id,
            lote: Some(lot.lote.clone()),
            cantidad_unidades: lot.cantidad_unidades,
            cantidad_reservada: lot.cantidad_reservada,
            ubicacion: lot.ubicacion.clone(),
            fecha_ingreso: Utc::now(),
            fecha_vencimiento: lot.fecha_vencimiento,
            documento_id: lot.documento_id,
        };
        tables.lots.push(row.clone());
        Ok(row)
    }

    async fn update_lot(&self, id: Uuid, changes: &LotChanges) -> AppResult<StockLot> {
        let mut tables = self.tables.lock().unwrap();
        let lot = tables
            .lots
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(AppError::NotFound { entity: "stock lot" })?;
        if let Some(quantity) = changes.cantidad_unidades {
            if quantity < lot.cantidad_reservada {
                return Err(AppError::validation(
                    "quantities must be non-negative and not below the reserved quantity",
                ));
            }
            lot.cantidad_unidades = quantity;
        }
        if let Some(code) = &changes.lote {
            lot.lote = Some(code.clone());
        }
        Ok(lot.clone())
    }

    async fn delete_lot(&self, id: Uuid) -> AppResult<StockLot> {
        let mut tables = self.tables.lock().unwrap();
        let index = tables
            .lots
            .iter()
            .position(|l| l.id == id)
            .ok_or(AppError::NotFound { entity: "stock lot" })?;
        Ok(tables.lots.remove(index))
    }

    async fn create_ingress_document(
        &self,
        document: &NewIngressDocument,
    ) -> AppResult<IngressDocument> {
        if self.fail_document_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let row = IngressDocument {
            id: Uuid::new_v4(),
            proveedor: document.proveedor.clone(),
            documento: document.documento.clone(),
            observacion: document.observacion.clone(),
            archivo_url: document.archivo_url.clone(),
            creado_por: document.creado_por,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().documents.push(row.clone());
        Ok(row)
    }
}
