pub mod pages;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tariff_domain::{MonthlyAggregate, PriceColumn};

use crate::{
    chart,
    chart_store::ChartStore,
    config::{AppConfig, ChartDelivery},
    pipeline::TariffError,
    report::{self, Report},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: ChartStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = ChartStore::new(config.chart.output_dir.clone());
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/", get(index).post(upload))
        .route("/api/reports", post(api_report))
        .route("/charts/:file", get(chart_file))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub fn status_for(e: &TariffError) -> StatusCode {
    match e {
        TariffError::Schema(_)
        | TariffError::EmptyResult
        | TariffError::Parse { .. }
        | TariffError::Coercion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TariffError::UnknownLayout(_) | TariffError::Source(_) => StatusCode::BAD_REQUEST,
        TariffError::NotFound(_) => StatusCode::NOT_FOUND,
        TariffError::Layout { .. } | TariffError::Chart(_) | TariffError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Where the browser finds the chart: a stored file, inline data, or both.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_uri: Option<String>,
}

impl ChartRef {
    /// `src` attribute for an `<img>` tag.
    pub fn src(&self) -> &str {
        self.url.as_deref().or(self.data_uri.as_deref()).unwrap_or_default()
    }
}

async fn deliver(state: &AppState, png: &[u8]) -> Result<ChartRef, TariffError> {
    match state.config.chart.delivery {
        ChartDelivery::Inline => Ok(ChartRef {
            data_uri: Some(chart::to_data_uri(png)),
            ..ChartRef::default()
        }),
        ChartDelivery::Stored => {
            let id = state.store.save(png).await?;
            Ok(ChartRef {
                url: Some(format!("/charts/{id}.png")),
                id: Some(id),
                data_uri: None,
            })
        }
    }
}

async fn run_report(
    state: &AppState,
    layout: &str,
    data: Bytes,
) -> Result<(Report, ChartRef), TariffError> {
    metrics::counter!("http_reports_total").increment(1);
    let layout = state.config.layout(layout)?;
    let report = report::build_report(data, layout, state.config.chart.options()).await?;
    let chart = deliver(state, &report.png).await?;
    Ok((report, chart))
}

fn report_failed(e: &TariffError) -> StatusCode {
    let status = status_for(e);
    metrics::counter!("http_reports_failed_total").increment(1);
    if status.is_server_error() {
        tracing::error!(error = %e, "report failed");
    } else {
        tracing::info!(error = %e, "report rejected");
    }
    status
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let names = state.config.layout_names();
    Html(pages::index(&names, &state.config.default_layout))
}

#[derive(Default)]
struct UploadForm {
    file: Option<Bytes>,
    layout: Option<String>,
}

async fn read_upload(
    multipart: &mut Multipart,
) -> Result<UploadForm, axum::extract::multipart::MultipartError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => form.file = Some(field.bytes().await?),
            Some("layout") => form.layout = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let names = state.config.layout_names();
    let default_layout = state.config.default_layout.as_str();

    let form = match read_upload(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            tracing::info!(error = %e, "unreadable upload");
            let page = pages::error(&e.body_text(), &names, default_layout);
            return (e.status(), Html(page)).into_response();
        }
    };

    let layout = form.layout.as_deref().filter(|l| !l.is_empty()).unwrap_or(default_layout);
    let Some(file) = form.file.filter(|f| !f.is_empty()) else {
        let page = pages::error("no file uploaded", &names, layout);
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    };

    match run_report(&state, layout, file).await {
        Ok((report, chart)) => Html(pages::result(&pages::ResultPage {
            title: report.title,
            table: &report.table,
            skipped_rows: report.skipped_rows,
            image_src: chart.src(),
            layouts: &names,
            layout,
        }))
        .into_response(),
        Err(e) => {
            let status = report_failed(&e);
            (status, Html(pages::error(&e.to_string(), &names, layout))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    layout: Option<String>,
}

#[derive(Serialize)]
struct ColumnView {
    key: PriceColumn,
    label: &'static str,
}

#[derive(Serialize)]
struct ReportResponse<'a> {
    layout: &'a str,
    title: &'static str,
    columns: Vec<ColumnView>,
    months: &'a [MonthlyAggregate],
    skipped_rows: usize,
    chart: ChartRef,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn api_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    body: Bytes,
) -> Response {
    let layout = query.layout.unwrap_or_else(|| state.config.default_layout.clone());

    match run_report(&state, &layout, body).await {
        Ok((report, chart)) => {
            let columns = report
                .table
                .columns()
                .iter()
                .map(|c| ColumnView { key: *c, label: c.label() })
                .collect();
            Json(ReportResponse {
                layout: &report.layout,
                title: report.title,
                columns,
                months: report.table.months(),
                skipped_rows: report.skipped_rows,
                chart,
            })
            .into_response()
        }
        Err(e) => {
            let status = report_failed(&e);
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

async fn chart_file(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some(id) = file.strip_suffix(".png") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.store.load(id).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "failed to read chart");
            }
            status.into_response()
        }
    }
}
