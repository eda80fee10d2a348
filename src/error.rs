use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("statistics are not valid delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("boundary document is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("boundary document must be a FeatureCollection")]
    NotFeatureCollection,

    #[error("statistics have no `{0}` column")]
    MissingColumn(String),

    #[error("no `{prefix}<year>` columns found in statistics header")]
    NoYears { prefix: String },

    #[error("`{0}` is not one of the available years")]
    UnknownYear(String),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
