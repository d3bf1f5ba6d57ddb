use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{IngressDocument, NewIngressDocument, NewStockLot, StockLot},
    repository::InventoryStore,
    services::{catalog, lots::parse_quantity},
};

/// Sub-directory of the upload root holding ingress PDFs.
pub const DOCUMENTS_DIR: &str = "ingresos";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngressRequest {
    pub proveedor: Option<String>,
    pub documento: Option<String>,
    pub observacion: Option<String>,
    #[serde(default)]
    pub lineas: Vec<IngressLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngressLine {
    pub variante_id: Option<Uuid>,
    /// Brand and variant text, used when `variante_id` is absent.
    pub producto_base: Option<String>,
    pub variante: Option<String>,
    pub laboratorio: Option<String>,
    pub lote: Option<String>,
    /// `YYYY-MM-DD`; empty means no expiry.
    pub fecha_vencimiento: Option<String>,
    pub ubicacion: Option<String>,
    pub cantidad_unidades: Option<Value>,
}

/// Uploaded supplier document.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Serialize)]
pub struct IngressOutcome {
    pub documento: IngressDocument,
    pub lotes: Vec<StockLot>,
}

#[derive(Debug, Clone, PartialEq)]
enum LineTarget {
    Variant(Uuid),
    Names {
        brand: String,
        variant: String,
        laboratory: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct ValidLine {
    target: LineTarget,
    lote: String,
    cantidad: Decimal,
    ubicacion: Option<String>,
    fecha_vencimiento: Option<NaiveDate>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_line(index: usize, line: &IngressLine) -> AppResult<ValidLine> {
    let number = index + 1;
    let fail = |reason: &str| AppError::validation(format!("line {}: {}", number, reason));

    let lote = non_empty(line.lote.as_deref()).ok_or_else(|| fail("lot code is required"))?;

    let cantidad = match &line.cantidad_unidades {
        Some(value) if !value.is_null() => {
            parse_quantity(value).map_err(|err| match err {
                AppError::Validation(reason) => fail(&reason),
                other => other,
            })?
        }
        _ => return Err(fail("quantity is required")),
    };
    if cantidad <= Decimal::ZERO {
        return Err(fail("quantity must be a positive number"));
    }

    let target = match line.variante_id {
        Some(id) => LineTarget::Variant(id),
        None => {
            let brand = non_empty(line.producto_base.as_deref());
            let variant = non_empty(line.variante.as_deref());
            match (brand, variant) {
                (Some(brand), Some(variant)) => LineTarget::Names {
                    brand,
                    variant,
                    laboratory: non_empty(line.laboratorio.as_deref()),
                },
                _ => return Err(fail("a variant id or brand and variant names are required")),
            }
        }
    };

    let fecha_vencimiento = match non_empty(line.fecha_vencimiento.as_deref()) {
        Some(text) => Some(
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map_err(|_| fail("expiry date must be YYYY-MM-DD"))?,
        ),
        None => None,
    };

    Ok(ValidLine {
        target,
        lote,
        cantidad,
        ubicacion: non_empty(line.ubicacion.as_deref()),
        fecha_vencimiento,
    })
}

fn validate_attachment(attachment: Option<&Attachment>) -> AppResult<Option<&Attachment>> {
    let Some(attachment) = attachment.filter(|a| !a.data.is_empty()) else {
        return Ok(None);
    };
    let extension = attachment
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("pdf") => Ok(Some(attachment)),
        _ => Err(AppError::validation("the attached document must be a PDF")),
    }
}

/// Writes the PDF and returns its public URL and on-disk path.
async fn store_attachment(
    upload_dir: &Path,
    attachment: &Attachment,
) -> AppResult<(String, PathBuf)> {
    let dir: PathBuf = upload_dir.join(DOCUMENTS_DIR);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("could not create {}: {}", dir.display(), e)))?;

    let file_name = format!("{}.pdf", Uuid::new_v4());
    let path = dir.join(&file_name);
    fs::write(&path, &attachment.data)
        .await
        .map_err(|e| AppError::Internal(format!("could not write {}: {}", path.display(), e)))?;

    Ok((format!("/uploads/{}/{}", DOCUMENTS_DIR, file_name), path))
}

pub async fn register_ingress<S: InventoryStore>(
    store: &S,
    user_id: Option<Uuid>,
    request: &IngressRequest,
    attachment: Option<&Attachment>,
    upload_dir: &Path,
) -> AppResult<IngressOutcome> {
    if request.lineas.is_empty() {
        return Err(AppError::validation("at least one line is required"));
    }
    let lines = request
        .lineas
        .iter()
        .enumerate()
        .map(|(index, line)| validate_line(index, line))
        .collect::<AppResult<Vec<_>>>()?;
    let attachment = validate_attachment(attachment)?;

    // Every given id must exist before any find-or-create runs.
    for (index, line) in lines.iter().enumerate() {
        if let LineTarget::Variant(id) = &line.target {
            if store.get_variant(*id).await?.is_none() {
                return Err(AppError::validation(format!(
                    "line {}: unknown variant {}",
                    index + 1,
                    id
                )));
            }
        }
    }

    let mut variant_ids = Vec::with_capacity(lines.len());
    for line in &lines {
        let id = match &line.target {
            LineTarget::Variant(id) => *id,
            LineTarget::Names {
                brand,
                variant,
                laboratory,
            } => catalog::ensure_variant(store, brand, variant, laboratory.as_deref()).await?,
        };
        variant_ids.push(id);
    }

    let stored = match attachment {
        Some(attachment) => Some(store_attachment(upload_dir, attachment).await?),
        None => None,
    };

    let new_document = NewIngressDocument {
        proveedor: non_empty(request.proveedor.as_deref()),
        documento: non_empty(request.documento.as_deref()),
        observacion: non_empty(request.observacion.as_deref()),
        archivo_url: stored.as_ref().map(|(url, _)| url.clone()),
        creado_por: user_id,
    };
    let documento = match store.create_ingress_document(&new_document).await {
        Ok(documento) => documento,
        Err(err) => {
            if let Some((_, path)) = &stored {
                if let Err(e) = fs::remove_file(path).await {
                    log::warn!("Could not remove orphaned upload {}: {}", path.display(), e);
                }
            }
            return Err(err);
        }
    };

    let mut lotes = Vec::with_capacity(lines.len());
    for (line, variante_id) in lines.into_iter().zip(variant_ids) {
        let lot = store
            .insert_lot(&NewStockLot {
                variante_id,
                lote: line.lote,
                cantidad_unidades: line.cantidad,
                cantidad_reservada: Decimal::ZERO,
                ubicacion: line.ubicacion,
                fecha_vencimiento: line.fecha_vencimiento,
                documento_id: Some(documento.id),
            })
            .await?;
        lotes.push(lot);
    }

    log::info!(
        "Registered ingress {} with {} lot(s)",
        documento.id,
        lotes.len()
    );
    Ok(IngressOutcome { documento, lotes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn named_line(brand: &str, variant: &str, lote: &str, quantity: Value) -> IngressLine {
        IngressLine {
            producto_base: Some(brand.to_string()),
            variante: Some(variant.to_string()),
            laboratorio: Some("Allergan".to_string()),
            lote: Some(lote.to_string()),
            cantidad_unidades: Some(quantity),
            ..Default::default()
        }
    }

    fn request(lineas: Vec<IngressLine>) -> IngressRequest {
        IngressRequest {
            proveedor: Some("Distribuidora Sur".to_string()),
            documento: Some("F-0012".to_string()),
            observacion: None,
            lineas,
        }
    }

    fn upload_dir() -> PathBuf {
        std::env::temp_dir().join(format!("clinica-ingress-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn registers_one_lot_per_line_under_one_document() {
        let store = MemoryStore::new();
        let req = request(vec![
            named_line("Juvederm", "Volift", "L1", json!(10)),
            named_line("juvederm", "VOLIFT", "L2", json!("2.5")),
        ]);

        let outcome = register_ingress(&store, None, &req, None, &upload_dir())
            .await
            .unwrap();

        assert_eq!(outcome.lotes.len(), 2);
        assert_eq!(outcome.lotes[0].variante_id, outcome.lotes[1].variante_id);
        assert_eq!(outcome.lotes[1].cantidad_unidades, dec!(2.5));
        assert!(outcome
            .lotes
            .iter()
            .all(|l| l.documento_id == Some(outcome.documento.id)));
        assert_eq!(store.brand_count(), 1);
        assert_eq!(store.variant_count(), 1);
    }

    #[tokio::test]
    async fn invalid_line_rejects_whole_request_without_writes() {
        let cases = vec![
            named_line("Radiesse", "1.5ml", "L1", json!(0)),
            named_line("Radiesse", "1.5ml", "L1", json!(-3)),
            named_line("Radiesse", "1.5ml", "   ", json!(4)),
            named_line("Radiesse", "1.5ml", "L1", json!("muchos")),
            IngressLine {
                lote: Some("L1".to_string()),
                cantidad_unidades: Some(json!(4)),
                ..Default::default()
            },
        ];

        for bad in cases {
            let store = MemoryStore::new();
            let req = request(vec![named_line("Botox", "100U", "OK-1", json!(5)), bad]);

            let err = register_ingress(&store, None, &req, None, &upload_dir())
                .await
                .unwrap_err();

            match err {
                AppError::Validation(message) => assert!(message.starts_with("line 2")),
                other => panic!("unexpected error {other:?}"),
            }
            assert_eq!(store.brand_count(), 0);
            assert_eq!(store.variant_count(), 0);
            assert_eq!(store.lot_count(), 0);
            assert_eq!(store.document_count(), 0);
        }
    }

    #[tokio::test]
    async fn quantity_below_stored_precision_is_not_registered() {
        let store = MemoryStore::new();
        let req = request(vec![named_line("Botox", "100U", "B1", json!(0.001))]);

        let err = register_ingress(&store, None, &req, None, &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.lot_count(), 0);
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let store = MemoryStore::new();

        let err = register_ingress(&store, None, &request(vec![]), None, &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_variant_id_writes_nothing() {
        let store = MemoryStore::new();
        let req = request(vec![IngressLine {
            variante_id: Some(Uuid::new_v4()),
            lote: Some("L9".to_string()),
            cantidad_unidades: Some(json!(1)),
            ..Default::default()
        }]);

        let err = register_ingress(&store, None, &req, None, &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.document_count(), 0);
        assert_eq!(store.lot_count(), 0);
    }

    #[tokio::test]
    async fn unknown_variant_id_after_named_line_leaves_catalog_untouched() {
        let store = MemoryStore::new();
        let req = request(vec![
            named_line("Belotero", "Balance", "B1", json!(2)),
            IngressLine {
                variante_id: Some(Uuid::new_v4()),
                lote: Some("B2".to_string()),
                cantidad_unidades: Some(json!(1)),
                ..Default::default()
            },
        ]);

        let err = register_ingress(&store, None, &req, None, &upload_dir())
            .await
            .unwrap_err();

        match err {
            AppError::Validation(message) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.brand_count(), 0);
        assert_eq!(store.variant_count(), 0);
        assert_eq!(store.lot_count(), 0);
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_before_lots_are_written() {
        let store = MemoryStore::new();
        store.fail_variant_inserts();
        let req = request(vec![named_line("Sculptra", "Vial", "S1", json!(2))]);

        let err = register_ingress(&store, None, &req, None, &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Catalog(_)));
        assert_eq!(store.lot_count(), 0);
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn pdf_attachment_is_stored_and_linked() {
        let store = MemoryStore::new();
        let dir = upload_dir();
        let attachment = Attachment {
            filename: Some("factura.PDF".to_string()),
            data: Bytes::from_static(b"%PDF-1.4"),
        };
        let req = request(vec![named_line("Profhilo", "2ml", "P1", json!(3))]);

        let outcome = register_ingress(&store, None, &req, Some(&attachment), &dir)
            .await
            .unwrap();

        let url = outcome.documento.archivo_url.unwrap();
        assert!(url.starts_with("/uploads/ingresos/") && url.ends_with(".pdf"));
        let file_name = url.rsplit('/').next().unwrap();
        assert!(dir.join(DOCUMENTS_DIR).join(file_name).exists());
    }

    #[tokio::test]
    async fn stored_pdf_is_removed_when_document_insert_fails() {
        let store = MemoryStore::new();
        store.fail_document_inserts();
        let dir = upload_dir();
        let attachment = Attachment {
            filename: Some("factura.pdf".to_string()),
            data: Bytes::from_static(b"%PDF-1.4"),
        };
        let req = request(vec![named_line("Profhilo", "2ml", "P1", json!(3))]);

        let err = register_ingress(&store, None, &req, Some(&attachment), &dir)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let leftover = std::fs::read_dir(dir.join(DOCUMENTS_DIR)).unwrap().count();
        assert_eq!(leftover, 0);
        assert_eq!(store.lot_count(), 0);
    }

    #[tokio::test]
    async fn non_pdf_attachment_is_rejected() {
        let store = MemoryStore::new();
        let attachment = Attachment {
            filename: Some("foto.jpg".to_string()),
            data: Bytes::from_static(b"\xff\xd8"),
        };
        let req = request(vec![named_line("Profhilo", "2ml", "P1", json!(3))]);

        let err = register_ingress(&store, None, &req, Some(&attachment), &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.brand_count(), 0);
    }

    #[tokio::test]
    async fn bad_expiry_date_is_a_validation_error() {
        let store = MemoryStore::new();
        let mut line = named_line("Botox", "50U", "B1", json!(1));
        line.fecha_vencimiento = Some("31/12/2026".to_string());

        let err = register_ingress(&store, None, &request(vec![line]), None, &upload_dir())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
