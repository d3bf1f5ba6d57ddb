use std::cmp::Ordering;

use deunicode::deunicode;
use serde::Serialize;

use crate::models::{AvailabilityRow, StockLotListing, Variant};
use crate::services::availability::compute_availability;

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub emergencias: usize,
}

impl ReportSummary {
    pub fn of(rows: &[AvailabilityRow]) -> Self {
        Self {
            total: rows.len(),
            emergencias: rows.iter().filter(|r| r.estado.is_emergency()).count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub resumen: ReportSummary,
    pub filas: Vec<AvailabilityRow>,
}

impl From<Vec<AvailabilityRow>> for StockReport {
    fn from(filas: Vec<AvailabilityRow>) -> Self {
        Self {
            resumen: ReportSummary::of(&filas),
            filas,
        }
    }
}

pub fn build_report(
    lots: &[StockLotListing],
    variants: &[Variant],
    query: &str,
) -> Vec<AvailabilityRow> {
    let rows = compute_availability(lots, variants).into_values().collect();
    let mut rows = filter_rows(rows, query);
    sort_rows(&mut rows);
    rows
}

/// Keeps rows whose brand, variant or laboratory contains `query`, ignoring case.
pub fn filter_rows(rows: Vec<AvailabilityRow>, query: &str) -> Vec<AvailabilityRow> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| {
            let haystack =
                format!("{} {} {}", row.producto_base, row.variante, row.laboratorio).to_lowercase();
            haystack.contains(&needle)
        })
        .collect()
}

/// Emergencies first, then by brand + variant name. Laboratory and id break
/// ties, so rows coming out of the aggregation map always land in one order.
pub fn sort_rows(rows: &mut [AvailabilityRow]) {
    rows.sort_by(|a, b| {
        a.estado
            .cmp(&b.estado)
            .then_with(|| compare_names(&display_name(a), &display_name(b)))
            .then_with(|| compare_names(&a.laboratorio, &b.laboratorio))
            .then_with(|| a.variante_id.cmp(&b.variante_id))
    });
}

fn display_name(row: &AvailabilityRow) -> String {
    format!("{} {}", row.producto_base, row.variante)
}

/// Accent- and case-insensitive comparison, so "Ácido" sorts next to "acido".
/// Falls back to the raw strings to keep the order total.
fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(value: &str) -> String {
    deunicode(value).to_lowercase()
}

pub fn write_csv(rows: &[AvailabilityRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "producto_base",
        "variante",
        "laboratorio",
        "unidad",
        "disponible",
        "stock_minimo",
        "estado",
    ])?;
    for row in rows {
        let disponible = row.disponible.normalize().to_string();
        let minimo = row.stock_minimo.normalize().to_string();
        writer.write_record([
            row.producto_base.as_str(),
            row.variante.as_str(),
            row.laboratorio.as_str(),
            row.unidad.as_str(),
            disponible.as_str(),
            minimo.as_str(),
            row.estado.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
