use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    str::FromStr,
    thread,
};

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::{AtlasError, Result},
    stats_reader::{StatsSchema, TabularIndex},
    year::YearSet,
};

/// Municipality boundary from the feature collection.
#[derive(Clone, Debug)]
pub struct Municipality {
    pub code: String,
    pub name: String,
    pub shape: MultiPolygon<f64>,
}

#[derive(Deserialize)]
struct FeatureProps {
    code: Value,
    #[serde(default)]
    name: String,
}

/// Codes may be stored as strings or numbers; both index by their text.
fn code_text(code: &Value) -> Option<String> {
    match code {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn municipality(feature: Feature) -> Option<Municipality> {
    let props = feature.properties?;
    let props: FeatureProps = serde_json::from_value(Value::Object(props)).ok()?;
    let code = code_text(&props.code)?;

    let Some(geometry) = feature.geometry else {
        warn!(code = %code, "feature has no geometry");
        return None;
    };
    let shape = match Geometry::<f64>::try_from(geometry.value) {
        Ok(Geometry::Polygon(p)) => p.into(),
        Ok(Geometry::MultiPolygon(m)) => m,
        Ok(_) | Err(_) => {
            warn!(code = %code, "feature geometry is not a polygon");
            return None;
        }
    };
    Some(Municipality { code, name: props.name, shape })
}

/// Extracts every polygonal feature keyed by its `code` property.
pub fn parse_boundaries(text: &str) -> Result<Vec<Municipality>> {
    let GeoJson::FeatureCollection(fc) = GeoJson::from_str(text)? else {
        return Err(AtlasError::NotFeatureCollection);
    };
    Ok(fc.features.into_iter().filter_map(municipality).collect())
}

/// Both resources the map needs, loaded together.
pub struct LoadedData {
    pub boundaries: Vec<Municipality>,
    pub index: TabularIndex,
}

/// Where the boundary and statistics documents live and how to read them.
#[derive(Clone, Debug)]
pub struct DataSource {
    base: PathBuf,
    map_file: String,
    stats_file: String,
    schema: StatsSchema,
    years: Option<YearSet>,
}

impl DataSource {
    pub fn new<P: AsRef<Path>>(base: P, map_file: &str, stats_file: &str) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            map_file: map_file.to_string(),
            stats_file: stats_file.to_string(),
            schema: StatsSchema::default(),
            years: None,
        }
    }

    pub fn with_schema(mut self, schema: StatsSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Fixes the year enumeration instead of discovering it from the header.
    pub fn with_years(mut self, years: YearSet) -> Self {
        self.years = Some(years);
        self
    }

    pub fn load_boundaries(&self) -> Result<Vec<Municipality>> {
        let path = self.base.join(&self.map_file);
        let text = fs::read_to_string(&path).map_err(|source| AtlasError::Io { path, source })?;
        parse_boundaries(&text)
    }

    pub fn load_stats(&self) -> Result<TabularIndex> {
        let path = self.base.join(&self.stats_file);
        let file = File::open(&path).map_err(|source| AtlasError::Io { path, source })?;
        TabularIndex::from_reader(file, &self.schema, self.years.as_ref())
    }

    /// Reads both documents concurrently and waits for both. When both fail
    /// the boundary error is the one returned.
    pub fn load(&self) -> Result<LoadedData> {
        let (boundaries, index) = thread::scope(|s| {
            let boundaries = s.spawn(|| self.load_boundaries());
            let index = self.load_stats();
            (join(boundaries), index)
        });
        let boundaries = boundaries?;
        let index = index?;

        let unmatched = boundaries
            .iter()
            .filter(|m| index.names.name_of(&m.code).is_none())
            .count();
        if unmatched > 0 {
            warn!(unmatched, "boundaries without statistics rows");
        }
        info!(
            boundaries = boundaries.len(),
            municipalities = index.metrics.len(),
            years = index.years().len(),
            "data loaded"
        );
        Ok(LoadedData { boundaries, index })
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "code": "091", "name": "Helsinki" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[24.8, 60.1], [25.2, 60.1], [25.2, 60.3], [24.8, 60.3], [24.8, 60.1]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "code": 49, "name": "Espoo" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[24.5, 60.1], [24.8, 60.1], [24.8, 60.3], [24.5, 60.1]]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "code": "000", "name": "Nowhere" },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "name": "No code" },
                "geometry": { "type": "Point", "coordinates": [25.0, 61.0] }
            }
        ]
    }"#;

    #[test]
    fn keeps_polygonal_features_with_codes() {
        let ms = parse_boundaries(MAP).unwrap();
        let codes: Vec<&str> = ms.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, ["091", "49"]);
        assert_eq!(ms[0].name, "Helsinki");
        assert_eq!(ms[0].shape.0.len(), 1);
    }

    #[test]
    fn rejects_non_collections() {
        let err = parse_boundaries(r#"{"type":"Point","coordinates":[1.0,2.0]}"#).unwrap_err();
        assert!(matches!(err, AtlasError::NotFeatureCollection));
        assert!(matches!(parse_boundaries("not json"), Err(AtlasError::GeoJson(_))));
    }

    #[test]
    fn missing_files_report_their_path() {
        let source = DataSource::new("/nonexistent", "map.json", "stats.csv");
        match source.load() {
            Err(AtlasError::Io { path, .. }) => assert!(path.ends_with("map.json")),
            other => panic!("expected io error, got {:?}", other.err()),
        }
    }

    #[test]
    fn stats_failure_is_reported_when_boundaries_load() {
        let dir = std::env::temp_dir().join(format!("library-atlas-data-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("map.json"), MAP).unwrap();
        let result = DataSource::new(&dir, "map.json", "stats.csv").load();
        std::fs::remove_dir_all(&dir).unwrap();
        match result {
            Err(AtlasError::Io { path, .. }) => assert!(path.ends_with("stats.csv")),
            other => panic!("expected io error, got {:?}", other.err()),
        }
    }
}
