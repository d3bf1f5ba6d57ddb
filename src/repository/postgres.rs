use uuid::Uuid;

use super::{InventoryStore, DEFAULT_UNIT};
use crate::{
    database::Database,
    error::{map_unique_violation, AppError, AppResult},
    models::{
        Brand, IngressDocument, LotChanges, NewBrand, NewIngressDocument, NewStockLot,
        NewVariant, StockLot, StockLotListing, Variant,
    },
    services::availability::MIN_STOCK_FLOOR,
};

const VARIANT_COLUMNS: &str = r#"
    v.id, v.producto_base_id, pb.nombre AS producto_base_nombre, v.nombre, v.laboratorio,
    v.unidad_base, v.contenido_por_presentacion, v.es_medico, v.stock_minimo_unidades,
    v.created_at
"#;

#[derive(Clone)]
pub struct PgInventoryStore {
    db: Database,
}

impl PgInventoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn map_check_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_check_violation() {
            return AppError::validation(
                "quantities must be non-negative and not below the reserved quantity",
            );
        }
    }
    AppError::Database(err)
}

impl InventoryStore for PgInventoryStore {
    async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>("SELECT * FROM productos_base ORDER BY nombre")
            .fetch_all(&self.db)
            .await?;
        Ok(brands)
    }

    async fn create_brand(&self, input: &NewBrand) -> AppResult<Brand> {
        sqlx::query_as::<_, Brand>(
            r#"
            INSERT INTO productos_base (nombre, categoria, descripcion)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(input.nombre.trim())
        .bind(&input.categoria)
        .bind(&input.descripcion)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            map_unique_violation(e, || format!("brand '{}' already exists", input.nombre.trim()))
        })
    }

    async fn ensure_brand(&self, nombre: &str) -> AppResult<Uuid> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO productos_base (nombre) VALUES ($1) ON CONFLICT DO NOTHING RETURNING id",
        )
        .bind(nombre)
        .fetch_optional(&self.db)
        .await?;

        if let Some(id) = inserted {
            log::info!("Created brand '{}' ({})", nombre, id);
            return Ok(id);
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM productos_base WHERE lower(btrim(nombre)) = lower(btrim($1))",
        )
        .bind(nombre)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn list_variants(&self) -> AppResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM variantes v JOIN productos_base pb ON pb.id = v.producto_base_id \
             ORDER BY pb.nombre, v.nombre",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as::<_, Variant>(&sql).fetch_all(&self.db).await?;
        Ok(variants)
    }

    async fn get_variant(&self, id: Uuid) -> AppResult<Option<Variant>> {
        let sql = format!(
            "SELECT {} FROM variantes v JOIN productos_base pb ON pb.id = v.producto_base_id \
             WHERE v.id = $1",
            VARIANT_COLUMNS
        );
        let variant = sqlx::query_as::<_, Variant>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(variant)
    }

    async fn create_variant(&self, input: &NewVariant) -> AppResult<Variant> {
        let sql = format!(
            r#"
            WITH v AS (
                INSERT INTO variantes (
                    producto_base_id, nombre, laboratorio, unidad_base,
                    contenido_por_presentacion, es_medico, stock_minimo_unidades
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {} FROM v JOIN productos_base pb ON pb.id = v.producto_base_id
            "#,
            VARIANT_COLUMNS
        );
        let unidad = input
            .unidad_base
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT);

        sqlx::query_as::<_, Variant>(&sql)
            .bind(input.producto_base_id)
            .bind(input.nombre.trim())
            .bind(input.laboratorio.as_deref().map(str::trim))
            .bind(unidad)
            .bind(input.contenido_por_presentacion)
            .bind(input.es_medico)
            .bind(input.stock_minimo_unidades)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::NotFound { entity: "brand" };
                    }
                }
                map_unique_violation(e, || {
                    format!("variant '{}' already exists for this brand", input.nombre.trim())
                })
            })
    }

    async fn ensure_variant(
        &self,
        brand_id: Uuid,
        nombre: &str,
        laboratorio: Option<&str>,
    ) -> AppResult<Uuid> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO variantes (producto_base_id, nombre, laboratorio, unidad_base, stock_minimo_unidades)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(brand_id)
        .bind(nombre)
        .bind(laboratorio)
        .bind(DEFAULT_UNIT)
        .bind(MIN_STOCK_FLOOR)
        .fetch_optional(&self.db)
        .await?;

        if let Some(id) = inserted {
            log::info!("Created variant '{}' ({})", nombre, id);
            return Ok(id);
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM variantes
            WHERE producto_base_id = $1
              AND lower(btrim(nombre)) = lower(btrim($2))
              AND lower(btrim(coalesce(laboratorio, ''))) = lower(btrim(coalesce($3::text, '')))
            "#,
        )
        .bind(brand_id)
        .bind(nombre)
        .bind(laboratorio)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn list_lots(&self) -> AppResult<Vec<StockLotListing>> {
        let lots = sqlx::query_as::<_, StockLotListing>(
            r#"
            SELECT
                l.id, l.variante_id, l.lote, l.cantidad_unidades, l.cantidad_reservada,
                l.ubicacion, l.fecha_ingreso, l.fecha_vencimiento, l.documento_id,
                pb.nombre AS producto_base_nombre,
                v.nombre AS variante_nombre,
                v.laboratorio,
                v.unidad_base
            FROM stock_lotes l
            LEFT JOIN variantes v ON v.id = l.variante_id
            LEFT JOIN productos_base pb ON pb.id = v.producto_base_id
            ORDER BY l.fecha_ingreso DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(lots)
    }

    async fn get_lot(&self, id: Uuid) -> AppResult<Option<StockLot>> {
        let lot = sqlx::query_as::<_, StockLot>("SELECT * FROM stock_lotes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(lot)
    }

    async fn insert_lot(&self, lot: &NewStockLot) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(
            r#"
            INSERT INTO stock_lotes (
                variante_id, lote, cantidad_unidades, cantidad_reservada,
                ubicacion, fecha_vencimiento, documento_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(lot.variante_id)
        .bind(&lot.lote)
        .bind(lot.cantidad_unidades)
        .bind(lot.cantidad_reservada)
        .bind(&lot.ubicacion)
        .bind(lot.fecha_vencimiento)
        .bind(lot.documento_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_check_violation)
    }

    async fn update_lot(&self, id: Uuid, changes: &LotChanges) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(
            r#"
            UPDATE stock_lotes
            SET lote = COALESCE($2, lote),
                cantidad_unidades = COALESCE($3, cantidad_unidades)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.lote)
        .bind(changes.cantidad_unidades)
        .fetch_optional(&self.db)
        .await
        .map_err(map_check_violation)?
        .ok_or(AppError::NotFound { entity: "stock lot" })
    }

    async fn delete_lot(&self, id: Uuid) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>("DELETE FROM stock_lotes WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound { entity: "stock lot" })
    }

    async fn create_ingress_document(
        &self,
        document: &NewIngressDocument,
    ) -> AppResult<IngressDocument> {
        let created = sqlx::query_as::<_, IngressDocument>(
            r#"
            INSERT INTO documentos_ingreso (proveedor, documento, observacion, archivo_url, creado_por)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&document.proveedor)
        .bind(&document.documento)
        .bind(&document.observacion)
        .bind(&document.archivo_url)
        .bind(document.creado_por)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }
}
