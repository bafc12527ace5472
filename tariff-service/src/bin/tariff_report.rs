use anyhow::{bail, Context, Result};
use axum::body::Bytes;
use std::env;
use tariff_service::{build_report, config::AppConfig, observability};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: tariff_report <csv_file_path> [layout] [chart.png]");
    }
    let file_path = &args[1];

    // Load configuration (can point TARIFF_CONFIG to a file with extra layouts).
    let cfg = AppConfig::load()?;
    let layout_name = args.get(2).map(String::as_str).unwrap_or(&cfg.default_layout);
    let layout = cfg.layout(layout_name)?;

    let data = tokio::fs::read(file_path)
        .await
        .with_context(|| format!("failed to read {file_path}"))?;

    let report = build_report(Bytes::from(data), layout, cfg.chart.options()).await?;

    if let Some(chart_path) = args.get(3) {
        tokio::fs::write(chart_path, &report.png)
            .await
            .with_context(|| format!("failed to write chart to {chart_path}"))?;
        tracing::info!(path = %chart_path, "chart written");
    }

    let summary = serde_json::json!({
        "layout": report.layout,
        "title": report.title,
        "columns": report.table.columns(),
        "months": report.table.months(),
        "skipped_rows": report.skipped_rows,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
