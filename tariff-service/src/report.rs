use std::sync::Arc;

use axum::body::Bytes;
use tariff_domain::{MonthlyTable, Reading, Tariff};

use crate::{
    chart::{self, ChartOptions},
    pipeline::{Pipeline, TariffError},
    sinks::MonthlyAggregateSink,
    sources::{CsvLayout, CsvUploadSource},
    transform,
};

/// Everything produced by one upload: monthly table plus chart bytes.
#[derive(Debug, Clone)]
pub struct Report {
    pub layout: String,
    pub title: &'static str,
    pub table: MonthlyTable,
    pub skipped_rows: usize,
    pub png: Vec<u8>,
}

/// Aggregate the usage file and render its chart.
///
/// Fails without rendering anything when a required column is missing or no
/// row survives parsing.
pub async fn build_report(
    data: Bytes,
    layout: &CsvLayout,
    options: ChartOptions,
) -> Result<Report, TariffError> {
    let pipeline: Pipeline<_, Reading, _> = Pipeline {
        source: CsvUploadSource::new(data, layout.clone()),
        transforms: vec![Arc::new(transform::ReadingValidation)],
        sink: MonthlyAggregateSink::new(Tariff::STANDARD, layout.has_time_column()),
    };
    let outcome = pipeline.run().await?;

    // Plotting is CPU bound; keep it off the async workers.
    let table = outcome.table;
    let (table, png) = tokio::task::spawn_blocking(move || {
        let png = chart::render_png(&table, &options);
        (table, png)
    })
    .await
    .map_err(|e| TariffError::Chart(format!("render task failed: {e}")))?;
    let png = png?;

    tracing::info!(
        layout = %layout.name,
        months = table.months().len(),
        readings = table.reading_count(),
        skipped_rows = outcome.skipped_rows,
        "report built"
    );

    Ok(Report {
        layout: layout.name.clone(),
        title: chart::title_for(&table),
        table,
        skipped_rows: outcome.skipped_rows,
        png,
    })
}
