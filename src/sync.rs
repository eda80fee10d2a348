//! Keeps the selection, the displayed year and the dependent views in step.
//!
//! Views never mutate state themselves: they report activations and search
//! submissions here, then redraw whatever [`SyncController::take_redraw`]
//! hands back.

use bitflags::bitflags;
use tracing::debug;

use crate::{
    color::ColorScale,
    error::Result,
    selection::{SelectionStore, SortDirection},
    stats_reader::{Metric, TabularIndex, YearData},
    year::{Year, YearContext},
};

bitflags! {
    /// Views that need redrawing after a state change.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Views: u8 {
        const MAP = 1 << 0;
        const CHART = 1 << 1;
        const LIST = 1 << 2;
        const LEGEND = 1 << 3;
    }
}

impl Views {
    const SELECTION: Views = Views::MAP.union(Views::CHART).union(Views::LIST);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    Selected(String),
    Deselected(String),
    NotFound,
}

pub struct SyncController {
    index: TabularIndex,
    selection: SelectionStore,
    year: YearContext,
    last_sort: Option<SortDirection>,
    pending: Views,
}

impl SyncController {
    pub fn new(index: TabularIndex) -> Self {
        let year = YearContext::new(index.years().clone());
        Self {
            index,
            selection: SelectionStore::new(),
            year,
            last_sort: None,
            pending: Views::all(),
        }
    }

    pub fn index(&self) -> &TabularIndex {
        &self.index
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn year(&self) -> Year {
        self.year.current()
    }

    pub fn year_context(&self) -> &YearContext {
        &self.year
    }

    /// Current-year value from the full dataset.
    pub fn metric(&self, code: &str) -> Metric {
        self.index.metrics.get(code, self.year())
    }

    /// Domain shared by the map colours and the bar lengths.
    pub fn color_scale(&self) -> ColorScale {
        ColorScale::new(self.index.metrics.max(self.year()))
    }

    /// Toggles `code`; returns `true` when it ended up selected.
    pub fn on_municipality_activated(&mut self, code: &str, name: &str, year_data: YearData) -> bool {
        let selected = if self.selection.is_selected(code) {
            self.selection.remove_by_code(code);
            false
        } else {
            self.selection.add(code, name, year_data)
        };
        debug!(code, name, selected, count = self.selection.len(), "selection toggled");
        self.pending |= Views::SELECTION;
        selected
    }

    /// Toggles `code` with its name and a fresh snapshot from the index.
    pub fn activate(&mut self, code: &str) -> bool {
        let name = self.index.names.name_of(code).unwrap_or(code).to_string();
        let year_data = self.index.metrics.year_data(code);
        self.on_municipality_activated(code, &name, year_data)
    }

    /// Resolves a typed name and toggles it like a click. Unknown names change nothing.
    pub fn on_search_submitted(&mut self, raw: &str) -> SearchOutcome {
        let Some(code) = self.index.names.code_of(raw).map(str::to_string) else {
            debug!(query = raw, "search found no municipality");
            return SearchOutcome::NotFound;
        };
        if self.activate(&code) {
            SearchOutcome::Selected(code)
        } else {
            SearchOutcome::Deselected(code)
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.pending |= Views::SELECTION;
        }
    }

    pub fn set_year(&mut self, year: Year) -> Result<bool> {
        let changed = self.year.set(year)?;
        self.year_changed(changed);
        Ok(changed)
    }

    /// Slider movement; clamps at the first and last year.
    pub fn step_year(&mut self, delta: isize) -> bool {
        let changed = self.year.step(delta);
        self.year_changed(changed);
        changed
    }

    fn year_changed(&mut self, changed: bool) {
        if changed {
            debug!(year = %self.year(), "year changed");
            self.pending |= Views::all();
        }
    }

    /// Sorts the selection on the current year, alternating direction on
    /// each call and starting with descending.
    pub fn toggle_sort(&mut self) -> SortDirection {
        let direction = self
            .last_sort
            .map_or(SortDirection::Descending, SortDirection::flipped);
        self.selection.sort_by_year(self.year(), direction);
        self.last_sort = Some(direction);
        debug!(?direction, year = %self.year(), "selection sorted");
        self.pending |= Views::CHART | Views::LIST;
        direction
    }

    pub fn last_sort(&self) -> Option<SortDirection> {
        self.last_sort
    }

    /// Drains the pending redraw set.
    pub fn take_redraw(&mut self) -> Views {
        std::mem::take(&mut self.pending)
    }
}
