//! Output formatting and persistence for figures, aggregates and reports.
//!
//! Figures are written as Plotly JSON or as standalone HTML pages; zipcode
//! aggregates as CSV.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregate::ZipcodeAggregate;
use crate::figure::Figure;
use crate::maps::ZipcodeFigures;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FigureFormat {
    Html,
    Json,
}

impl FigureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FigureFormat::Html => "html",
            FigureFormat::Json => "json",
        }
    }
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders a figure as a self-contained HTML page that draws it with plotly.js.
pub fn render_html(figure: &Figure) -> Result<String> {
    // `</` inside the inline script would close the tag early
    let json = figure.to_json()?.replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <script src="{cdn}"></script>
</head>
<body>
    <div id="figure"></div>
    <script>
        const figure = {json};
        Plotly.newPlot("figure", figure.data, figure.layout);
    </script>
    <!-- generated {generated} -->
</body>
</html>
"#,
        title = escape_html(&figure.layout.title.text),
        cdn = PLOTLY_CDN,
        json = json,
        generated = Utc::now().to_rfc3339(),
    ))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Writes one figure to `path` in the given format.
pub fn write_figure(path: &Path, figure: &Figure, format: FigureFormat) -> Result<()> {
    let content = match format {
        FigureFormat::Html => render_html(figure)?,
        FigureFormat::Json => figure.to_json()?,
    };
    fs::write(path, content).with_context(|| format!("Failed to write figure: {}", path.display()))?;
    debug!(path = %path.display(), "Figure written");
    Ok(())
}

/// Writes the four maps into `dir` as `<metric>.<ext>`, creating `dir` if needed.
///
/// Returns the written paths in rating, score, count, reviews order.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), format = ?format))]
pub fn write_figures(figures: &ZipcodeFigures, dir: &Path, format: FigureFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut written = Vec::new();
    for (metric, figure) in figures.iter() {
        let path = dir.join(format!("{}.{}", metric.slug(), format.extension()));
        write_figure(&path, figure, format)?;
        written.push(path);
    }

    info!(count = written.len(), "Figures written");
    Ok(written)
}

/// Writes zipcode aggregates as CSV with a header row, replacing `path`.
pub fn write_aggregates_csv(path: &Path, aggregates: &[ZipcodeAggregate]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))?;

    for aggregate in aggregates {
        writer.serialize(aggregate)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = aggregates.len(), "Aggregates written");
    Ok(())
}
