//! Zipcode boundary geometry: shapefile loading, boundary decomposition and
//! the join against zipcode aggregates.

use crate::aggregate::ZipcodeAggregate;
use anyhow::{Context, Result, anyhow, bail};
use geo::{LineString, MultiLineString, MultiPolygon};
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Default location of the New York zipcode shapefile.
pub const DEFAULT_SHAPEFILE: &str = "maps/NY/NY-zipcodes.shp";

/// Zipcode key column of the 2020 ZCTA shapefiles.
pub const DEFAULT_KEY_COLUMN: &str = "ZCTA5CE20";

/// One zipcode polygon from the shapefile, keyed by its numeric zipcode.
#[derive(Debug, Clone)]
pub struct ZipBoundary {
    pub zip_code: u32,
    pub geometry: MultiPolygon<f64>,
}

/// The outline of a zipcode area.
///
/// A single polygon without holes has a single closed line as its
/// boundary; holes or several polygons give a multi-part boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    Line(LineString<f64>),
    MultiLine(MultiLineString<f64>),
}

impl Boundary {
    /// The individual line parts of the boundary.
    pub fn parts(&self) -> impl Iterator<Item = &LineString<f64>> {
        match self {
            Boundary::Line(line) => std::slice::from_ref(line).iter(),
            Boundary::MultiLine(lines) => lines.0.iter(),
        }
    }
}

/// Decomposes a zipcode geometry into its boundary rings.
///
/// Returns `None` for an empty geometry.
pub fn boundary_of(geometry: &MultiPolygon<f64>) -> Option<Boundary> {
    match geometry.0.as_slice() {
        [] => None,
        [polygon] if polygon.interiors().is_empty() => {
            Some(Boundary::Line(polygon.exterior().clone()))
        }
        polygons => {
            let rings: Vec<LineString<f64>> = polygons
                .iter()
                .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
                .filter(|ring| !ring.0.is_empty())
                .cloned()
                .collect();
            Some(Boundary::MultiLine(MultiLineString::new(rings)))
        }
    }
}

/// Reads every polygon in the shapefile at `path`, keyed by `key_column`.
///
/// The key is stored as text in the ZCTA files and is coerced to an integer.
/// Records with a null key and non-polygon shapes are skipped.
///
/// # Errors
///
/// Returns an error if the shapefile cannot be read, the key column is
/// missing, or a key is not a number.
#[tracing::instrument(skip_all, fields(path = %path.display(), key_column = %key_column))]
pub fn load_boundaries(path: &Path, key_column: &str) -> Result<Vec<ZipBoundary>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {}", path.display()))?;

    let mut boundaries = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) =
            result.with_context(|| format!("Failed to read Shapefile: {}", path.display()))?;

        let value = record
            .get(key_column)
            .ok_or_else(|| anyhow!("Key column '{}' not found in Shapefile", key_column))?;

        let Some(zip_code) = parse_zip_key(value)? else {
            debug!("Skipping shape with null zipcode key");
            continue;
        };

        let geometry: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon {}: {:?}", zip_code, e))?,
            Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM {}: {:?}", zip_code, e))?,
            Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ {}: {:?}", zip_code, e))?,
            other => {
                warn!(zip_code, shape_type = ?other.shapetype(), "Skipping non-polygon shape");
                continue;
            }
        };

        boundaries.push(ZipBoundary { zip_code, geometry });
    }

    info!(zipcodes = boundaries.len(), "Zipcode boundaries loaded");
    Ok(boundaries)
}

/// Numeric coercion of a shapefile key cell. `Ok(None)` for null cells.
pub fn parse_zip_key(value: &FieldValue) -> Result<Option<u32>> {
    match value {
        FieldValue::Character(Some(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let zip = trimmed
                .parse::<u32>()
                .with_context(|| format!("Zipcode key '{}' is not numeric", trimmed))?;
            Ok(Some(zip))
        }
        FieldValue::Character(None) | FieldValue::Numeric(None) => Ok(None),
        FieldValue::Numeric(Some(n)) => float_key(*n).map(Some),
        FieldValue::Integer(i) => u32::try_from(*i)
            .map(Some)
            .with_context(|| format!("Zipcode key {} is negative", i)),
        other => bail!("Unsupported zipcode key type: {:?}", other),
    }
}

fn float_key(n: f64) -> Result<u32> {
    if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
        bail!("Zipcode key {} is not a valid zipcode", n);
    }
    Ok(n as u32)
}

/// A zipcode present both in the shapefile and in the aggregates.
#[derive(Debug, Clone, Copy)]
pub struct MergedZipcode<'a> {
    pub boundary: &'a ZipBoundary,
    pub aggregate: &'a ZipcodeAggregate,
}

/// Result of joining aggregates onto boundaries.
#[derive(Debug)]
pub struct MergeReport<'a> {
    /// Joined rows, in shapefile order.
    pub rows: Vec<MergedZipcode<'a>>,
    /// Aggregate zipcodes with no boundary in the shapefile, ascending.
    pub unmatched: Vec<u32>,
}

/// Inner join of aggregates onto boundaries by zipcode.
///
/// Zipcodes missing from either side are dropped from `rows`; the
/// aggregate zipcodes that were dropped are listed in `unmatched`.
pub fn merge<'a>(
    boundaries: &'a [ZipBoundary],
    aggregates: &'a [ZipcodeAggregate],
) -> MergeReport<'a> {
    let mut by_zip: HashMap<u32, Vec<&ZipcodeAggregate>> = HashMap::new();
    for aggregate in aggregates {
        by_zip.entry(aggregate.zip_code).or_default().push(aggregate);
    }

    let mut rows = Vec::new();
    for boundary in boundaries {
        if let Some(matches) = by_zip.get(&boundary.zip_code) {
            rows.extend(matches.iter().map(|&aggregate| MergedZipcode {
                boundary,
                aggregate,
            }));
        }
    }

    let known: HashSet<u32> = boundaries.iter().map(|b| b.zip_code).collect();
    let mut unmatched: Vec<u32> = aggregates
        .iter()
        .map(|a| a.zip_code)
        .filter(|zip| !known.contains(zip))
        .collect();
    unmatched.sort_unstable();
    unmatched.dedup();

    if !unmatched.is_empty() {
        warn!(
            dropped = unmatched.len(),
            zipcodes = ?unmatched,
            "Aggregated zipcodes missing from the shapefile were dropped"
        );
    }

    MergeReport { rows, unmatched }
}
