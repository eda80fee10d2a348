use crate::{
    stats_reader::{Metric, YearData},
    year::Year,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// A chosen municipality with the values it had when it was selected.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionEntry {
    pub code: String,
    pub name: String,
    pub year_data: YearData,
}

impl SelectionEntry {
    pub fn metric(&self, year: Year) -> Metric {
        self.year_data.get(&year).copied().unwrap_or(Metric::Absent)
    }
}

/// Click-ordered set of selected municipalities, unique by code.
///
/// Pure data: callers decide what to redraw after a mutation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionStore {
    entries: Vec<SelectionEntry>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    /// Appends unless `code` is already present; returns whether it was added.
    pub fn add(&mut self, code: &str, name: &str, year_data: YearData) -> bool {
        if self.is_selected(code) {
            return false;
        }
        self.entries.push(SelectionEntry {
            code: code.to_string(),
            name: name.to_string(),
            year_data,
        });
        true
    }

    /// Returns the removed entry, if any.
    pub fn remove_by_code(&mut self, code: &str) -> Option<SelectionEntry> {
        let pos = self.entries.iter().position(|e| e.code == code)?;
        Some(self.entries.remove(pos))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stable in-place sort on `year`'s value. Absent values rank lowest in
    /// either direction's scale, so they lead ascending and trail descending.
    pub fn sort_by_year(&mut self, year: Year, direction: SortDirection) {
        self.entries.sort_by(|a, b| {
            let ord = a.metric(year).cmp_absent_lowest(&b.metric(year));
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }
}
