use std::{fmt, str::FromStr};

use crate::error::{AtlasError, Result};

/// Statistics year, e.g. `2022`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(pub u16);

impl FromStr for Year {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AtlasError::UnknownYear(s.to_string()));
        }
        s.parse::<u16>()
            .map(Year)
            .map_err(|_| AtlasError::UnknownYear(s.to_string()))
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed, ascending enumeration of years the dataset covers. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearSet {
    years: Vec<Year>,
}

impl YearSet {
    pub fn new(mut years: Vec<Year>) -> Option<Self> {
        years.sort();
        years.dedup();
        if years.is_empty() {
            None
        } else {
            Some(Self { years })
        }
    }

    /// Parses a comma separated list such as `2020,2021,2022`.
    pub fn parse_list(list: &str) -> Result<Self> {
        let years = list
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Year>>>()?;
        Self::new(years).ok_or_else(|| AtlasError::UnknownYear(list.to_string()))
    }

    /// Collects every `<prefix><year>` column of a header row.
    pub fn discover<S: AsRef<str>>(headers: &[S], prefix: &str) -> Result<Self> {
        let years = headers
            .iter()
            .filter_map(|h| h.as_ref().strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse().ok())
            .collect();
        Self::new(years).ok_or_else(|| AtlasError::NoYears { prefix: prefix.to_string() })
    }

    pub fn contains(&self, year: Year) -> bool {
        self.years.binary_search(&year).is_ok()
    }

    pub fn latest(&self) -> Year {
        // non-empty by construction
        self.years[self.years.len() - 1]
    }

    pub fn earliest(&self) -> Year {
        self.years[0]
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Year> + '_ {
        self.years.iter().copied()
    }

    fn index_of(&self, year: Year) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }
}

/// The single "currently displayed year" shared by every view.
#[derive(Clone, Debug)]
pub struct YearContext {
    years: YearSet,
    current: usize,
}

impl YearContext {
    pub fn new(years: YearSet) -> Self {
        let current = years.len() - 1;
        Self { years, current }
    }

    pub fn current(&self) -> Year {
        self.years.years[self.current]
    }

    pub fn years(&self) -> &YearSet {
        &self.years
    }

    /// Returns `Ok(true)` when the year actually changed.
    pub fn set(&mut self, year: Year) -> Result<bool> {
        let idx = self
            .years
            .index_of(year)
            .ok_or_else(|| AtlasError::UnknownYear(year.to_string()))?;
        let changed = idx != self.current;
        self.current = idx;
        Ok(changed)
    }

    /// Moves the slider by `delta` positions, clamping at both ends.
    pub fn step(&mut self, delta: isize) -> bool {
        let last = self.years.len() - 1;
        let target = self.current.saturating_add_signed(delta).min(last);
        let changed = target != self.current;
        self.current = target;
        changed
    }

    /// Slider position in `[0, 1]`.
    pub fn position(&self) -> f64 {
        let last = self.years.len() - 1;
        if last == 0 {
            1.0
        } else {
            self.current as f64 / last as f64
        }
    }
}
