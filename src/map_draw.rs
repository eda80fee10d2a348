use geo::{BoundingRect, Centroid, Contains, Coord, MapCoords, MultiPolygon, Point, Rect};
use library_atlas::data::Municipality;
use ratatui::{
    layout::Rect as TuiRect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Line, Points},
        Block, Borders,
    },
    Frame,
};

const FILL_ROWS: f64 = 180.0;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 8.0;
const ZOOM_STEP: f64 = 1.5;
const PAN_STEP: f64 = 0.15;

/// One municipality in projected map space.
struct Shape {
    code: String,
    name: String,
    shape: MultiPolygon<f64>,
    bbox: Rect<f64>,
    label_at: Option<(f64, f64)>,
    /// Interior sample grid used to paint the choropleth fill.
    fill: Vec<(f64, f64)>,
}

/// Choropleth map: projection, zoom/pan viewport and pointer hit-testing.
pub struct MapView {
    items: Vec<Shape>,
    extent: Rect<f64>,
    zoom: f64,
    center: Coord<f64>,
}

/// Equirectangular with the x axis shrunk by cos(φ₀) so shapes at high
/// latitudes keep their proportions.
fn project(shape: &MultiPolygon<f64>, kx: f64) -> MultiPolygon<f64> {
    shape.map_coords(|Coord { x, y }| Coord { x: x * kx, y })
}

/// Cap on samples per axis, whatever the window shape.
const MAX_SAMPLES_PER_AXIS: usize = 1024;

/// Interior points of `shape` on a grid of `step` laid over `window`.
/// Indices are integers so the loops end even when `step` is tiny relative
/// to the coordinates.
fn sample_interior(shape: &MultiPolygon<f64>, window: Rect<f64>, step: f64) -> Vec<(f64, f64)> {
    if !(step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    // snap to a global grid so neighbours share sample rows
    let x0 = (window.min().x / step).ceil() * step;
    let y0 = (window.min().y / step).ceil() * step;
    let count = |lo: f64, hi: f64| {
        let n = ((hi - lo) / step).floor();
        if n.is_finite() && n >= 0.0 { (n as usize + 1).min(MAX_SAMPLES_PER_AXIS) } else { 0 }
    };
    let (nx, ny) = (count(x0, window.max().x), count(y0, window.max().y));

    let mut points = Vec::new();
    for j in 0..ny {
        let y = y0 + j as f64 * step;
        for i in 0..nx {
            let x = x0 + i as f64 * step;
            if shape.contains(&Point::new(x, y)) {
                points.push((x, y));
            }
        }
    }
    points
}

fn intersection(a: Rect<f64>, b: Rect<f64>) -> Option<Rect<f64>> {
    let min = Coord { x: a.min().x.max(b.min().x), y: a.min().y.max(b.min().y) };
    let max = Coord { x: a.max().x.min(b.max().x), y: a.max().y.min(b.max().y) };
    (min.x <= max.x && min.y <= max.y).then(|| Rect::new(min, max))
}

impl MapView {
    pub fn new(boundaries: &[Municipality]) -> Self {
        let rects: Vec<Rect<f64>> = boundaries.iter().filter_map(|m| m.shape.bounding_rect()).collect();
        let (min_y, max_y) = rects
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r.min().y), hi.max(r.max().y)));
        let kx = if min_y.is_finite() { ((min_y + max_y) / 2.0).to_radians().cos() } else { 1.0 };

        let projected: Vec<(&Municipality, MultiPolygon<f64>, Rect<f64>)> = boundaries
            .iter()
            .filter_map(|m| {
                let shape = project(&m.shape, kx);
                let bbox = shape.bounding_rect()?;
                Some((m, shape, bbox))
            })
            .collect();

        let extent = projected
            .iter()
            .map(|(_, _, r)| *r)
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }));

        let items = projected
            .into_iter()
            .map(|(m, shape, bbox)| Shape {
                code: m.code.clone(),
                name: m.name.clone(),
                fill: Vec::new(),
                label_at: shape.centroid().map(|p| (p.x(), p.y())),
                shape,
                bbox,
            })
            .collect();

        let mut view = Self { items, extent, zoom: MIN_ZOOM, center: extent.center() };
        view.resample();
        view
    }

    /// Refills the sample grid for the visible window, so the fill keeps
    /// the same density at every zoom level.
    fn resample(&mut self) {
        let ([x0, x1], [y0, y1]) = self.bounds();
        let window = Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 });
        let step = window.height() / FILL_ROWS;
        for item in &mut self.items {
            item.fill = match intersection(item.bbox, window) {
                Some(visible) => sample_interior(&item.shape, visible, step),
                None => Vec::new(),
            };
        }
    }

    /// Number of municipalities on the map.
    pub fn feature_count(&self) -> usize {
        self.items.len()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.clamp_center();
            self.resample();
        }
    }

    /// Pans by a fraction of the visible window; `dx`/`dy` are step counts.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.view_size();
        self.center.x += dx * w * PAN_STEP;
        self.center.y += dy * h * PAN_STEP;
        self.clamp_center();
        self.resample();
    }

    fn view_size(&self) -> (f64, f64) {
        (self.extent.width() / self.zoom, self.extent.height() / self.zoom)
    }

    fn clamp_center(&mut self) {
        let (w, h) = self.view_size();
        let (min, max) = (self.extent.min(), self.extent.max());
        self.center.x = clamp_or_mid(self.center.x, min.x + w / 2.0, max.x - w / 2.0);
        self.center.y = clamp_or_mid(self.center.y, min.y + h / 2.0, max.y - h / 2.0);
    }

    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let (w, h) = self.view_size();
        (
            [self.center.x - w / 2.0, self.center.x + w / 2.0],
            [self.center.y - h / 2.0, self.center.y + h / 2.0],
        )
    }

    /// Municipality under a terminal cell of the map widget drawn at `area`.
    pub fn hit_test(&self, area: TuiRect, column: u16, row: u16) -> Option<(&str, &str)> {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        if inner.width == 0
            || inner.height == 0
            || column < inner.x
            || row < inner.y
            || column >= inner.x + inner.width
            || row >= inner.y + inner.height
        {
            return None;
        }
        let ([x0, x1], [y0, y1]) = self.bounds();
        let fx = (f64::from(column - inner.x) + 0.5) / f64::from(inner.width);
        let fy = (f64::from(row - inner.y) + 0.5) / f64::from(inner.height);
        let point = Point::new(x0 + fx * (x1 - x0), y1 - fy * (y1 - y0));

        self.items
            .iter()
            .find(|s| s.bbox.contains(&point) && s.shape.contains(&point))
            .map(|s| (s.code.as_str(), s.name.as_str()))
    }

    /// Draws the fill coloured by `fill`, then all outlines, then the
    /// selected municipalities with their labels.
    pub fn render(
        &self,
        f: &mut Frame<'_>,
        area: TuiRect,
        title: &str,
        fill: impl Fn(&str) -> Color,
        selected: impl Fn(&str) -> bool,
    ) {
        let (x_bounds, y_bounds) = self.bounds();
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds(y_bounds)
            .paint(|ctx| {
                for item in &self.items {
                    ctx.draw(&Points { coords: &item.fill, color: fill(&item.code) });
                }
                ctx.layer();

                for item in &self.items {
                    draw_outline(ctx, &item.shape, Color::Black);
                }
                ctx.layer();

                for item in self.items.iter().filter(|i| selected(&i.code)) {
                    draw_outline(ctx, &item.shape, Color::Yellow);
                    if let Some((x, y)) = item.label_at {
                        ctx.print(
                            x,
                            y,
                            Span::styled(
                                item.name.clone(),
                                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                            ),
                        );
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

// at zoom 1 the range can invert by an epsilon
fn clamp_or_mid(v: f64, lo: f64, hi: f64) -> f64 {
    if lo <= hi { v.clamp(lo, hi) } else { (lo + hi) / 2.0 }
}

fn draw_outline(ctx: &mut ratatui::widgets::canvas::Context<'_>, shape: &MultiPolygon<f64>, color: Color) {
    for poly in &shape.0 {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            for window in ring.0.windows(2) {
                let (a, b) = (window[0], window[1]);
                ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square(code: &str, x: f64, y: f64) -> Municipality {
        Municipality {
            code: code.to_string(),
            name: format!("m{code}"),
            shape: polygon![
                (x: x, y: y),
                (x: x + 1.0, y: y),
                (x: x + 1.0, y: y + 1.0),
                (x: x, y: y + 1.0),
                (x: x, y: y),
            ]
            .into(),
        }
    }

    fn view() -> MapView {
        MapView::new(&[square("a", 0.0, 0.0), square("b", 1.0, 0.0)])
    }

    #[test]
    fn fill_samples_stay_inside_their_shape() {
        let v = view();
        assert_eq!(v.feature_count(), 2);
        for item in &v.items {
            assert!(!item.fill.is_empty());
            assert!(item.fill.iter().all(|(x, y)| item.bbox.contains(&Point::new(*x, *y))));
        }
    }

    #[test]
    fn hit_test_maps_cells_to_municipalities() {
        let v = view();
        let area = TuiRect::new(0, 0, 22, 12);
        // left and right halves of the 20x10 inner area
        assert_eq!(v.hit_test(area, 3, 5).map(|(c, _)| c), Some("a"));
        assert_eq!(v.hit_test(area, 18, 5).map(|(c, _)| c), Some("b"));
        assert_eq!(v.hit_test(area, 0, 0), None);
    }

    #[test]
    fn zoom_is_clamped_and_keeps_view_inside_extent() {
        let mut v = view();
        for _ in 0..20 {
            v.zoom_in();
        }
        assert_eq!(v.zoom(), MAX_ZOOM);
        v.pan(-100.0, 0.0);
        let ([x0, _], _) = v.bounds();
        assert!(x0 >= v.extent.min().x - 1e-9);
        for _ in 0..20 {
            v.zoom_out();
        }
        assert_eq!(v.zoom(), MIN_ZOOM);
    }

    fn fill_rows(item: &Shape) -> usize {
        let mut ys: Vec<f64> = item.fill.iter().map(|(_, y)| *y).collect();
        ys.dedup();
        ys.len()
    }

    #[test]
    fn zooming_in_keeps_fill_density_on_screen() {
        let mut v = view();
        for _ in 0..20 {
            v.zoom_in();
        }
        let ([x0, x1], [y0, y1]) = v.bounds();
        let a = &v.items[0];
        // the visible window is an eighth of the map but still gets a full grid
        assert!(fill_rows(a) >= FILL_ROWS as usize - 10, "{} rows", fill_rows(a));
        let eps = 1e-9;
        assert!(a.fill.iter().all(|(x, y)| *x >= x0 - eps && *x <= x1 + eps && *y >= y0 - eps && *y <= y1 + eps));
    }

    #[test]
    fn panning_resamples_the_new_window() {
        let mut v = view();
        for _ in 0..20 {
            v.zoom_in();
        }
        v.pan(100.0, 0.0);
        let ([x0, _], _) = v.bounds();
        assert!(v.items[0].fill.is_empty());
        assert!(v.items[1].fill.iter().all(|(x, _)| *x >= x0));
        assert!(!v.items[1].fill.is_empty());
    }

    #[test]
    fn flat_map_yields_no_fill_and_terminates() {
        let flat = Municipality {
            code: "x".to_string(),
            name: "flat".to_string(),
            shape: polygon![
                (x: 24.0, y: 60.0),
                (x: 25.0, y: 60.0),
                (x: 24.5, y: 60.0),
                (x: 24.0, y: 60.0),
            ]
            .into(),
        };
        let mut v = MapView::new(&[flat]);
        assert!(v.items[0].fill.is_empty());
        v.zoom_in();
        v.pan(1.0, 1.0);
        assert!(v.items[0].fill.is_empty());
    }

    #[test]
    fn grid_is_capped_per_axis() {
        let window = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let huge: MultiPolygon<f64> = polygon![
            (x: -1.0, y: -1.0),
            (x: 2.0, y: -1.0),
            (x: 2.0, y: 2.0),
            (x: -1.0, y: 2.0),
            (x: -1.0, y: -1.0),
        ]
        .into();
        let points = sample_interior(&huge, window, 1e-9);
        assert_eq!(points.len(), MAX_SAMPLES_PER_AXIS * MAX_SAMPLES_PER_AXIS);
        assert!(sample_interior(&huge, window, 0.0).is_empty());
        assert!(sample_interior(&huge, window, f64::NAN).is_empty());
    }
}
