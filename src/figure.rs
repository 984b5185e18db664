//! Figure model serialized in the Plotly JSON figure schema.
//!
//! Only the trace types and attributes the zipcode maps use are modelled:
//! a `choropleth` trace carrying its own GeoJSON, and `scattergeo` line
//! traces for the boundary overlay.

use anyhow::Result;
use geojson::FeatureCollection;
use serde::Serialize;

/// ColorBrewer PuBuGn, light to dark.
const PUBUGN: [&str; 9] = [
    "rgb(255,247,251)",
    "rgb(236,226,240)",
    "rgb(208,209,230)",
    "rgb(166,189,219)",
    "rgb(103,169,207)",
    "rgb(54,144,192)",
    "rgb(2,129,138)",
    "rgb(1,108,89)",
    "rgb(1,70,54)",
];

/// Builds the PuBuGn colour scale as `[position, colour]` stops.
/// `reversed` gives PuBuGn_r.
pub fn pubugn(reversed: bool) -> Vec<(f64, String)> {
    let last = (PUBUGN.len() - 1) as f64;
    let colors: Vec<&str> = if reversed {
        PUBUGN.iter().rev().copied().collect()
    } else {
        PUBUGN.to_vec()
    };

    colors
        .into_iter()
        .enumerate()
        .map(|(i, color)| (i as f64 / last, color.to_string()))
        .collect()
}

/// A complete figure: traces plus layout.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(layout: Layout) -> Self {
        Self {
            data: Vec::new(),
            layout,
        }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    pub fn add_traces<I: IntoIterator<Item = Trace>>(&mut self, traces: I) {
        self.data.extend(traces);
    }

    /// The choropleth trace, if the figure has one.
    pub fn choropleth(&self) -> Option<&ChoroplethTrace> {
        self.data.iter().find_map(|t| match t {
            Trace::Choropleth(c) => Some(c),
            Trace::ScatterGeo(_) => None,
        })
    }

    /// Number of scattergeo overlay traces.
    pub fn overlay_count(&self) -> usize {
        self.data
            .iter()
            .filter(|t| matches!(t, Trace::ScatterGeo(_)))
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Choropleth(ChoroplethTrace),
    ScatterGeo(ScatterGeoTrace),
}

/// Regions from `geojson` shaded by `z`; `locations` are matched against
/// each feature's `id`.
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethTrace {
    pub geojson: FeatureCollection,
    pub locations: Vec<usize>,
    pub z: Vec<Option<f64>>,
    pub customdata: Vec<[u32; 1]>,
    pub hovertemplate: String,
    pub colorscale: Vec<(f64, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f64>,
    pub colorbar: ColorBar,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

/// A non-interactive line drawn over the map.
#[derive(Debug, Clone, Serialize)]
pub struct ScatterGeoTrace {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub mode: &'static str,
    pub line: LineStyle,
    pub showlegend: bool,
    pub hoverinfo: &'static str,
}

impl ScatterGeoTrace {
    /// Thin gray outline with no legend entry and no tooltip.
    pub fn outline(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self {
            lon,
            lat,
            mode: "lines",
            line: LineStyle {
                width: 1.0,
                color: "lightgray",
            },
            showlegend: false,
            hoverinfo: "skip",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineStyle {
    pub width: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    pub height: u32,
    pub margin: Margin,
    pub geo: GeoLayout,
}

impl Layout {
    /// Map layout fitted to the plotted regions, base map hidden.
    pub fn map(title: &str, height: u32) -> Self {
        Self {
            title: Title {
                text: title.to_string(),
            },
            height,
            margin: Margin {
                r: 0,
                t: 40,
                l: 0,
                b: 0,
            },
            geo: GeoLayout {
                fitbounds: "locations",
                visible: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Margin {
    pub r: u32,
    pub t: u32,
    pub l: u32,
    pub b: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoLayout {
    pub fitbounds: &'static str,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_pubugn_endpoints() {
        let scale = pubugn(false);
        assert_eq!(scale.len(), 9);
        assert_eq!(scale[0], (0.0, "rgb(255,247,251)".to_string()));
        assert_eq!(scale[8], (1.0, "rgb(1,70,54)".to_string()));
    }

    #[test]
    fn test_pubugn_reversed() {
        let scale = pubugn(true);
        assert_eq!(scale[0].1, "rgb(1,70,54)");
        assert_eq!(scale[8].1, "rgb(255,247,251)");
        assert_eq!(scale[8].0, 1.0);
    }

    #[test]
    fn test_scattergeo_serializes_with_type_tag() {
        let trace = Trace::ScatterGeo(ScatterGeoTrace::outline(vec![-73.9, -73.8], vec![40.7, 40.8]));
        let json: Value = serde_json::to_value(&trace).unwrap();

        assert_eq!(json["type"], "scattergeo");
        assert_eq!(json["mode"], "lines");
        assert_eq!(json["hoverinfo"], "skip");
        assert_eq!(json["showlegend"], false);
        assert_eq!(json["line"]["color"], "lightgray");
        assert_eq!(json["lon"][1], -73.8);
    }

    #[test]
    fn test_layout_serialization() {
        let figure = Figure::new(Layout::map("Average Rating per Zipcode", 400));
        let json: Value = serde_json::from_str(&figure.to_json().unwrap()).unwrap();

        assert_eq!(json["layout"]["title"]["text"], "Average Rating per Zipcode");
        assert_eq!(json["layout"]["height"], 400);
        assert_eq!(json["layout"]["margin"]["t"], 40);
        assert_eq!(json["layout"]["geo"]["fitbounds"], "locations");
        assert_eq!(json["layout"]["geo"]["visible"], false);
        assert!(json["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_overlay_count_ignores_choropleth() {
        let mut figure = Figure::new(Layout::map("t", 400));
        figure.add_trace(Trace::Choropleth(ChoroplethTrace {
            geojson: FeatureCollection {
                bbox: None,
                features: vec![],
                foreign_members: None,
            },
            locations: vec![],
            z: vec![],
            customdata: vec![],
            hovertemplate: String::new(),
            colorscale: pubugn(false),
            zmin: None,
            zmax: None,
            colorbar: ColorBar {
                title: Title {
                    text: "rating".to_string(),
                },
            },
        }));
        figure.add_traces((0..3).map(|_| Trace::ScatterGeo(ScatterGeoTrace::outline(vec![], vec![]))));

        assert_eq!(figure.overlay_count(), 3);
        assert!(figure.choropleth().is_some());
    }
}
