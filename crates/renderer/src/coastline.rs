//! Coastline outlines from GeoJSON.
//!
//! Any mix of `LineString`, `MultiLineString`, `Polygon` and
//! `MultiPolygon` geometries is accepted, inside a `FeatureCollection`, a
//! single `Feature` or as a bare geometry. Only the outlines are kept.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Polylines in (longitude, latitude) degrees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coastline {
    pub lines: Vec<Vec<(f64, f64)>>,
}

impl Coastline {
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let coastline = Self::from_geojson_str(&text)?;
        debug!(path = %path.display(), lines = coastline.lines.len(), "Loaded coastline");
        Ok(coastline)
    }

    pub fn from_geojson_str(text: &str) -> RenderResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RenderError::Coastline(format!("not JSON: {e}")))?;
        let mut lines = Vec::new();
        collect_object(&value, &mut lines)?;
        Ok(Self { lines })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Split every line where consecutive points jump by more than 180°
    /// of longitude, so wrapped segments are never drawn across the map.
    pub fn split_at_dateline(&self, wrap: impl Fn(f64) -> f64) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        for line in &self.lines {
            let mut current: Vec<(f64, f64)> = Vec::new();
            for &(lon, lat) in line {
                let point = (wrap(lon), lat);
                if let Some(&(prev, _)) = current.last() {
                    if (point.0 - prev).abs() > 180.0 {
                        out.push(std::mem::take(&mut current));
                    }
                }
                current.push(point);
            }
            out.push(current);
        }
        out.retain(|l| l.len() > 1);
        out
    }
}

fn collect_object(value: &Value, lines: &mut Vec<Vec<(f64, f64)>>) -> RenderResult<()> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| RenderError::Coastline("FeatureCollection without features".into()))?;
            for feature in features {
                collect_object(feature, lines)?;
            }
            Ok(())
        }
        Some("Feature") => match value.get("geometry") {
            Some(Value::Null) | None => Ok(()),
            Some(geometry) => collect_object(geometry, lines),
        },
        Some("GeometryCollection") => {
            for geometry in value
                .get("geometries")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                collect_object(geometry, lines)?;
            }
            Ok(())
        }
        Some(kind) => {
            let coords = value
                .get("coordinates")
                .ok_or_else(|| RenderError::Coastline(format!("{kind} without coordinates")))?;
            collect_geometry(kind, coords, lines)
        }
        None => Err(RenderError::Coastline("object without a type".into())),
    }
}

fn collect_geometry(kind: &str, coords: &Value, lines: &mut Vec<Vec<(f64, f64)>>) -> RenderResult<()> {
    match kind {
        "LineString" => lines.push(positions(coords)?),
        "MultiLineString" | "Polygon" => {
            for ring in as_array(coords)? {
                lines.push(positions(ring)?);
            }
        }
        "MultiPolygon" => {
            for polygon in as_array(coords)? {
                for ring in as_array(polygon)? {
                    lines.push(positions(ring)?);
                }
            }
        }
        // points carry no outline
        "Point" | "MultiPoint" => {}
        other => {
            return Err(RenderError::Coastline(format!(
                "unsupported geometry type {other}"
            )))
        }
    }
    Ok(())
}

fn as_array(value: &Value) -> RenderResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| RenderError::Coastline("expected an array of coordinates".into()))
}

fn positions(value: &Value) -> RenderResult<Vec<(f64, f64)>> {
    as_array(value)?
        .iter()
        .map(|p| {
            let pair = as_array(p)?;
            match (pair.first().and_then(Value::as_f64), pair.get(1).and_then(Value::as_f64)) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(RenderError::Coastline(format!("bad position {p}"))),
            }
        })
        .collect()
}
