use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Json},
};
use askama::Template;
use serde::Deserialize;

use crate::{
    error::AppResult,
    filters,
    middleware::CurrentUser,
    models::AvailabilityRow,
    repository::InventoryStore,
    services::report::{build_report, write_csv, ReportSummary, StockReport},
    state::AppState,
};

const EXPORT_FILE_NAME: &str = "disponibilidad.csv";

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    q: String,
}

#[derive(Template)]
#[template(path = "inventory/stock_report.html")]
struct StockReportTemplate<'a> {
    rows: Vec<AvailabilityRow>,
    summary: ReportSummary,
    query: String,
    export_url: String,
    current_user: &'a CurrentUser,
}

/// Loads lots and variants once and runs the whole report pipeline on them.
async fn load_report<S: InventoryStore>(store: &S, query: &str) -> AppResult<Vec<AvailabilityRow>> {
    let lots = store.list_lots().await?;
    let variants = store.list_variants().await?;
    Ok(build_report(&lots, &variants, query))
}

pub async fn availability(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filters): Query<ReportFilters>,
) -> AppResult<Json<StockReport>> {
    let rows = load_report(&state.store(), &filters.q).await?;
    Ok(Json(StockReport::from(rows)))
}

pub async fn availability_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filters): Query<ReportFilters>,
) -> AppResult<Html<String>> {
    let rows = load_report(&state.store(), &filters.q).await?;
    let template = StockReportTemplate {
        summary: ReportSummary::of(&rows),
        rows,
        export_url: format!(
            "/inventario/disponibilidad/export?q={}",
            urlencoding::encode(filters.q.trim())
        ),
        query: filters.q,
        current_user: &user,
    };
    Ok(Html(template.render()?))
}

pub async fn availability_export(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filters): Query<ReportFilters>,
) -> AppResult<impl IntoResponse> {
    let rows = load_report(&state.store(), &filters.q).await?;
    let body = write_csv(&rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}
