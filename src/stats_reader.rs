use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt,
    io::Read,
};

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::{
    error::{AtlasError, Result},
    year::{Year, YearSet},
};

/// One statistics value, or the explicit marker that the source had none.
///
/// `Absent` is not zero: a municipality that lent nothing and one with no
/// reported data must render differently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    Absent,
    Value(f64),
}

impl Metric {
    /// Empty, unparseable and non-finite cells are all `Absent`.
    pub fn parse(cell: &str) -> Self {
        match cell.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Metric::Value(v),
            _ => Metric::Absent,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Absent => None,
        }
    }

    pub fn is_absent(self) -> bool {
        matches!(self, Metric::Absent)
    }

    /// Total order with `Absent` below every value.
    pub fn cmp_absent_lowest(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Metric::Absent, Metric::Absent) => Ordering::Equal,
            (Metric::Absent, Metric::Value(_)) => Ordering::Less,
            (Metric::Value(_), Metric::Absent) => Ordering::Greater,
            (Metric::Value(a), Metric::Value(b)) => a.total_cmp(b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.2}"),
            Metric::Absent => f.write_str("n/a"),
        }
    }
}

/// Per-year values of one municipality.
pub type YearData = BTreeMap<Year, Metric>;

/// One parsed row: column name to raw cell text.
pub type RawRecord = HashMap<String, String>;

/// Which columns carry the code, the name and the yearly metric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsSchema {
    pub code_column: String,
    pub name_column: String,
    /// Metric columns are named `<metric_prefix><year>`.
    pub metric_prefix: String,
}

impl Default for StatsSchema {
    fn default() -> Self {
        Self {
            code_column: "code".to_string(),
            name_column: "name".to_string(),
            metric_prefix: "metric_".to_string(),
        }
    }
}

impl StatsSchema {
    fn key_columns(&self) -> impl Iterator<Item = &String> {
        [&self.code_column, &self.name_column].into_iter()
    }

    pub fn metric_column(&self, year: Year) -> String {
        format!("{}{}", self.metric_prefix, year)
    }
}

/// Parses delimited text with a header row into raw records.
pub fn read_rows<R: Read>(reader: R) -> Result<(Vec<String>, Vec<RawRecord>)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }
    Ok((headers, rows))
}

/// code ↔ name, built once at load time.
#[derive(Clone, Debug, Default)]
pub struct CodeNameIndex {
    names: HashMap<String, String>,
    // lower-cased name -> code
    codes: HashMap<String, String>,
}

impl CodeNameIndex {
    /// Later inserts win in both directions, including two codes sharing a
    /// lower-cased name. A blank name is not searchable.
    fn insert(&mut self, code: &str, name: &str) {
        self.names.insert(code.to_string(), name.to_string());
        let key = fold(name);
        if !key.is_empty() {
            self.codes.insert(key, code.to_string());
        }
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Case-insensitive lookup of a typed name.
    pub fn code_of(&self, name: &str) -> Option<&str> {
        let key = fold(name);
        if key.is_empty() {
            return None;
        }
        self.codes.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// (code, year) → metric.
#[derive(Clone, Debug)]
pub struct MetricIndex {
    years: YearSet,
    data: HashMap<String, YearData>,
}

impl MetricIndex {
    pub fn years(&self) -> &YearSet {
        &self.years
    }

    pub fn get(&self, code: &str, year: Year) -> Metric {
        self.data
            .get(code)
            .and_then(|yd| yd.get(&year))
            .copied()
            .unwrap_or(Metric::Absent)
    }

    /// A full copy of a municipality's values, one entry per known year.
    /// Unknown codes yield an all-absent snapshot.
    pub fn year_data(&self, code: &str) -> YearData {
        self.years.iter().map(|y| (y, self.get(code, y))).collect()
    }

    /// Largest present value for `year`, used as the colour and bar domain.
    pub fn max(&self, year: Year) -> Option<f64> {
        self.data
            .values()
            .filter_map(|yd| yd.get(&year).and_then(|m| m.value()))
            .reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Both lookup tables built from the statistics document.
#[derive(Clone, Debug)]
pub struct TabularIndex {
    pub names: CodeNameIndex,
    pub metrics: MetricIndex,
}

impl TabularIndex {
    /// Rows may be ragged; a key column only counts as missing when no row
    /// carries it.
    pub fn build(schema: &StatsSchema, rows: &[RawRecord], years: &YearSet) -> Result<Self> {
        if !rows.is_empty() {
            for column in schema.key_columns() {
                if !rows.iter().any(|row| row.contains_key(column)) {
                    return Err(AtlasError::MissingColumn(column.clone()));
                }
            }
        }

        let columns: Vec<(Year, String)> =
            years.iter().map(|y| (y, schema.metric_column(y))).collect();

        let mut names = CodeNameIndex::default();
        let mut data = HashMap::with_capacity(rows.len());

        for (line, row) in rows.iter().enumerate() {
            let code = row.get(&schema.code_column).map(|c| c.trim()).unwrap_or("");
            if code.is_empty() {
                warn!(row = line + 1, "skipping statistics row without a code");
                continue;
            }
            let name = row.get(&schema.name_column).map(|n| n.trim()).unwrap_or("");
            names.insert(code, name);

            let year_data: YearData = columns
                .iter()
                .map(|(year, column)| {
                    let metric = row.get(column).map_or(Metric::Absent, |c| Metric::parse(c));
                    (*year, metric)
                })
                .collect();
            data.insert(code.to_string(), year_data);
        }

        debug!(municipalities = data.len(), years = years.len(), "statistics indexed");

        Ok(Self {
            names,
            metrics: MetricIndex { years: years.clone(), data },
        })
    }

    /// Reads and indexes in one go; when `years` is `None` they are taken
    /// from the header.
    pub fn from_reader<R: Read>(
        reader: R,
        schema: &StatsSchema,
        years: Option<&YearSet>,
    ) -> Result<Self> {
        let (headers, rows) = read_rows(reader)?;
        if let Some(column) = schema.key_columns().find(|c| !headers.contains(c)) {
            return Err(AtlasError::MissingColumn(column.clone()));
        }
        match years {
            Some(years) => Self::build(schema, &rows, years),
            None => {
                let years = YearSet::discover(&headers, &schema.metric_prefix)?;
                Self::build(schema, &rows, &years)
            }
        }
    }

    pub fn years(&self) -> &YearSet {
        self.metrics.years()
    }
}
