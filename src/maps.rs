//! Choropleth figures of the zipcode aggregates.

use crate::aggregate::{Metric, ZipcodeAggregate, aggregate_by_zipcode};
use crate::boundaries::{MergeReport, ZipBoundary, boundary_of, load_boundaries, merge};
use crate::config::MapConfig;
use crate::figure::{ChoroplethTrace, ColorBar, Figure, Layout, ScatterGeoTrace, Title, Trace, pubugn};
use crate::records::CoffeeshopRecord;
use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, feature::Id};
use tracing::{debug, info};

pub const DEFAULT_FIGURE_HEIGHT: u32 = 400;

/// The four zipcode maps, one per [`Metric`].
#[derive(Debug, Clone)]
pub struct ZipcodeFigures {
    pub rating: Figure,
    pub score: Figure,
    pub count: Figure,
    pub reviews: Figure,
}

impl ZipcodeFigures {
    pub fn get(&self, metric: Metric) -> &Figure {
        match metric {
            Metric::Rating => &self.rating,
            Metric::Score => &self.score,
            Metric::ShopCount => &self.count,
            Metric::Reviews => &self.reviews,
        }
    }

    /// Figures paired with their metric, in [`Metric::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &Figure)> {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

/// Aggregates `records`, loads the configured shapefile and builds the maps.
#[tracing::instrument(skip_all, fields(shapefile = %config.shapefile.display()))]
pub fn render_maps(config: &MapConfig, records: &[CoffeeshopRecord]) -> Result<ZipcodeFigures> {
    let aggregates = aggregate_by_zipcode(records);
    info!(zipcodes = aggregates.len(), "Records aggregated by zipcode");

    let boundaries = load_boundaries(&config.shapefile, &config.key_column)?;

    Ok(create_interactive_plots(
        &aggregates,
        &boundaries,
        config.figure_height,
    ))
}

/// Builds the rating, score, shop-count and review-count maps.
///
/// Each map shades the zipcodes present in both `aggregates` and
/// `boundaries`, and carries the outline of every boundary as overlay
/// traces.
pub fn create_interactive_plots(
    aggregates: &[ZipcodeAggregate],
    boundaries: &[ZipBoundary],
    height: u32,
) -> ZipcodeFigures {
    let merged = merge(boundaries, aggregates);
    let overlay = boundary_traces(boundaries);

    debug!(
        merged = merged.rows.len(),
        overlay = overlay.len(),
        "Building zipcode figures"
    );

    let build = |metric: Metric| {
        let mut figure = Figure::new(Layout::map(metric.title(), height));
        figure.add_trace(Trace::Choropleth(choropleth(&merged, metric)));
        figure.add_traces(overlay.iter().cloned().map(Trace::ScatterGeo));
        figure
    };

    ZipcodeFigures {
        rating: build(Metric::Rating),
        score: build(Metric::Score),
        count: build(Metric::ShopCount),
        reviews: build(Metric::Reviews),
    }
}

/// Choropleth trace of one metric over the merged zipcodes.
///
/// Feature ids and locations are the merged row indices.
pub fn choropleth(merged: &MergeReport<'_>, metric: Metric) -> ChoroplethTrace {
    let features = merged
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&row.boundary.geometry))),
            id: Some(Id::Number(i.into())),
            properties: None,
            foreign_members: None,
        })
        .collect();

    let (zmin, zmax) = match metric.range() {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };

    ChoroplethTrace {
        geojson: FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        locations: (0..merged.rows.len()).collect(),
        z: merged.rows.iter().map(|r| metric.value(r.aggregate)).collect(),
        customdata: merged.rows.iter().map(|r| [r.boundary.zip_code]).collect(),
        hovertemplate: format!(
            "zip_code=%{{customdata[0]}}<br>{}=%{{z}}<extra></extra>",
            metric.column()
        ),
        colorscale: pubugn(metric.reversed_scale()),
        zmin,
        zmax,
        colorbar: ColorBar {
            title: Title {
                text: metric.column().to_string(),
            },
        },
    }
}

/// One outline trace per boundary line part of every zipcode.
pub fn boundary_traces(boundaries: &[ZipBoundary]) -> Vec<ScatterGeoTrace> {
    let mut traces = Vec::new();

    for boundary in boundaries.iter().filter_map(|b| boundary_of(&b.geometry)) {
        traces.extend(boundary.parts().map(|line| {
            let lon = line.coords().map(|c| c.x).collect();
            let lat = line.coords().map(|c| c.y).collect();
            ScatterGeoTrace::outline(lon, lat)
        }));
    }

    traces
}
