use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use library_atlas::{
    selection::SortDirection,
    sync::{SearchOutcome, SyncController, Views},
};
use ratatui::layout::Rect;
use tracing::trace;

use crate::map_draw::MapView;

#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

/// Loaded data: state controller plus map geometry.
pub struct Atlas {
    pub controller: SyncController,
    pub map: MapView,
}

pub struct AppState {
    /// `None` when loading failed; only quitting is left.
    pub atlas: Option<Atlas>,
    pub load_error: Option<String>,
    pub mode: Mode,
    pub query: String,
    pub hover: Option<String>,
    pub status: String,
    /// Map area from the last frame, for mouse hit-testing.
    pub map_area: Rect,
    dirty: bool,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
klik: zaznacz/odznacz gminę
/: szukaj po nazwie, Enter: zatwierdź
←/→: rok
s: sortuj, c: wyczyść
+/-: zoom, h j k l: przesuwanie
q: wyjście";

    pub fn ready(controller: SyncController, map: MapView) -> Self {
        Self::with(Some(Atlas { controller, map }), None)
    }

    pub fn unavailable(reason: String) -> Self {
        Self::with(None, Some(reason))
    }

    fn with(atlas: Option<Atlas>, load_error: Option<String>) -> Self {
        Self {
            atlas,
            load_error,
            mode: Mode::Normal,
            query: String::new(),
            hover: None,
            status: String::new(),
            map_area: Rect::default(),
            dirty: true,
        }
    }

    /// Whether the screen needs redrawing; drains pending requests.
    pub fn take_redraw(&mut self) -> bool {
        let views = self
            .atlas
            .as_mut()
            .map_or(Views::empty(), |a| a.controller.take_redraw());
        if !views.is_empty() {
            trace!(?views, "redraw requested");
        }
        std::mem::take(&mut self.dirty) || !views.is_empty()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true when the app should quit
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        self.dirty = true;
        if self.mode == Mode::Search {
            self.handle_search_input(key);
            return false;
        }

        let Some(atlas) = self.atlas.as_mut() else {
            return matches!(key, KeyCode::Char('q') | KeyCode::Esc);
        };
        let c = &mut atlas.controller;

        use KeyCode::*;
        match key {
            Char('q') => return true,
            Char('/') => {
                self.mode = Mode::Search;
                self.query.clear();
            }
            Left => {
                c.step_year(-1);
            }
            Right => {
                c.step_year(1);
            }
            Char('s') => {
                let dir = c.toggle_sort();
                let label = match dir {
                    SortDirection::Descending => "malejąco",
                    SortDirection::Ascending => "rosnąco",
                };
                self.status = format!("Posortowano {label} ({})", c.year());
            }
            Char('c') => {
                c.clear_selection();
                self.status = "Wyczyszczono wybór".to_string();
            }
            Char('+') | Char('=') => atlas.map.zoom_in(),
            Char('-') => atlas.map.zoom_out(),
            Char('h') => atlas.map.pan(-1.0, 0.0),
            Char('l') => atlas.map.pan(1.0, 0.0),
            Char('k') => atlas.map.pan(0.0, 1.0),
            Char('j') => atlas.map.pan(0.0, -1.0),
            _ => {}
        }
        false
    }

    fn handle_search_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.query.clear();
            }
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let query = std::mem::take(&mut self.query);
                if let Some(atlas) = self.atlas.as_mut() {
                    self.status = match atlas.controller.on_search_submitted(&query) {
                        SearchOutcome::Selected(code) => format!("Zaznaczono {}", display_name(atlas, &code)),
                        SearchOutcome::Deselected(code) => format!("Odznaczono {}", display_name(atlas, &code)),
                        SearchOutcome::NotFound => format!("Nie znaleziono: {}", query.trim()),
                    };
                }
            }
            KeyCode::Char(ch) => self.query.push(ch),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        let Some(atlas) = self.atlas.as_mut() else {
            return;
        };
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = atlas
                    .map
                    .hit_test(self.map_area, event.column, event.row)
                    .map(|(code, name)| (code.to_string(), name.to_string()));
                if let Some((code, name)) = hit {
                    let year_data = atlas.controller.index().metrics.year_data(&code);
                    atlas.controller.on_municipality_activated(&code, &name, year_data);
                }
            }
            MouseEventKind::Moved => {
                let hover = atlas
                    .map
                    .hit_test(self.map_area, event.column, event.row)
                    .map(|(_, name)| name.to_string());
                if hover != self.hover {
                    self.hover = hover;
                    self.dirty = true;
                }
            }
            MouseEventKind::ScrollUp => {
                atlas.map.zoom_in();
                self.dirty = true;
            }
            MouseEventKind::ScrollDown => {
                atlas.map.zoom_out();
                self.dirty = true;
            }
            _ => {}
        }
    }
}

fn display_name(atlas: &Atlas, code: &str) -> String {
    atlas.controller.index().names.name_of(code).unwrap_or(code).to_string()
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use geo::polygon;
    use library_atlas::{
        data::Municipality,
        stats_reader::{StatsSchema, TabularIndex},
        year::Year,
    };

    use super::*;

    fn state() -> AppState {
        let csv = "code,name,metric_2021,metric_2022\n091,Helsinki,1,2\n049,Espoo,3,\n";
        let index = TabularIndex::from_reader(csv.as_bytes(), &StatsSchema::default(), None).unwrap();
        let square = |code: &str, name: &str, x: f64| Municipality {
            code: code.to_string(),
            name: name.to_string(),
            shape: geo::polygon![
                (x: x, y: 0.0),
                (x: x + 1.0, y: 0.0),
                (x: x + 1.0, y: 1.0),
                (x: x, y: 1.0),
                (x: x, y: 0.0),
            ]
            .into(),
        };
        let map = MapView::new(&[square("091", "Helsinki", 0.0), square("049", "Espoo", 1.0)]);
        let mut s = AppState::ready(SyncController::new(index), map);
        s.map_area = Rect::new(0, 0, 22, 12);
        s
    }

    fn controller(s: &AppState) -> &SyncController {
        &s.atlas.as_ref().unwrap().controller
    }

    fn click(s: &mut AppState, column: u16) {
        s.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row: 5,
            modifiers: KeyModifiers::NONE,
        });
    }

    fn type_query(s: &mut AppState, text: &str) {
        s.handle_input(KeyCode::Char('/'));
        for ch in text.chars() {
            s.handle_input(KeyCode::Char(ch));
        }
        s.handle_input(KeyCode::Enter);
    }

    #[test]
    fn clicking_a_shape_toggles_it() {
        let mut s = state();
        click(&mut s, 3);
        click(&mut s, 18);
        let codes: Vec<&str> = controller(&s).selection().codes().collect();
        assert_eq!(codes, ["091", "049"]);
        click(&mut s, 3);
        let codes: Vec<&str> = controller(&s).selection().codes().collect();
        assert_eq!(codes, ["049"]);
    }

    #[test]
    fn search_mode_swallows_command_keys() {
        let mut s = state();
        type_query(&mut s, "qespoo");
        assert_eq!(s.mode, Mode::Normal);
        assert!(s.status.starts_with("Nie znaleziono"));
        type_query(&mut s, "ESPOO");
        assert_eq!(controller(&s).selection().len(), 1);
    }

    #[test]
    fn arrows_move_the_year_without_touching_selection() {
        let mut s = state();
        type_query(&mut s, "helsinki");
        s.handle_input(KeyCode::Left);
        assert_eq!(controller(&s).year(), Year(2021));
        assert_eq!(controller(&s).selection().len(), 1);
    }

    #[test]
    fn unavailable_state_only_quits() {
        let mut s = AppState::unavailable("brak pliku".into());
        assert!(!s.handle_input(KeyCode::Char('s')));
        assert!(s.handle_input(KeyCode::Char('q')));
    }
}
