use std::path::PathBuf;

use clap::Parser;
use library_atlas::{
    data::DataSource,
    stats_reader::StatsSchema,
    year::YearSet,
    Result,
};

#[derive(Debug, Parser)]
#[command(name = "library-atlas", version, about = "Library loans by Finnish municipality")]
pub struct Args {
    /// Directory holding the boundary and statistics files
    #[arg(long, env = "ATLAS_DATA_DIR", default_value = "resources")]
    pub data_dir: PathBuf,

    /// GeoJSON feature collection of municipality boundaries
    #[arg(long, env = "ATLAS_MAP_FILE", default_value = "finland-map-latest.json")]
    pub map_file: String,

    /// Statistics CSV, one row per municipality
    #[arg(long, env = "ATLAS_STATS_FILE", default_value = "library_stats_all_clean.csv")]
    pub stats_file: String,

    #[arg(long, default_value = "municipality_code")]
    pub code_column: String,

    #[arg(long, default_value = "municipality_name")]
    pub name_column: String,

    /// Metric columns are named <prefix><year>
    #[arg(long, default_value = "loans_per_population_")]
    pub metric_prefix: String,

    /// Comma separated years; discovered from the CSV header when omitted
    #[arg(long, value_name = "YEARS")]
    pub years: Option<String>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, env = "ATLAS_LOG_FILE", default_value = "library-atlas.log")]
    pub log_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn schema(&self) -> StatsSchema {
        StatsSchema {
            code_column: self.code_column.clone(),
            name_column: self.name_column.clone(),
            metric_prefix: self.metric_prefix.clone(),
        }
    }

    pub fn data_source(&self) -> Result<DataSource> {
        let source = DataSource::new(&self.data_dir, &self.map_file, &self.stats_file)
            .with_schema(self.schema());
        Ok(match &self.years {
            Some(list) => source.with_years(YearSet::parse_list(list)?),
            None => source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_dataset() {
        let args = Args::parse_from(["library-atlas"]);
        let schema = args.schema();
        assert_eq!(schema.code_column, "municipality_code");
        assert_eq!(schema.metric_column(library_atlas::year::Year(2022)), "loans_per_population_2022");
        assert!(args.years.is_none());
    }

    #[test]
    fn bad_year_list_is_rejected() {
        let args = Args::parse_from(["library-atlas", "--years", "2021,soon"]);
        assert!(args.data_source().is_err());
    }
}
