use library_atlas::{color::Rgb, stats_reader::Metric};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::state::{AppState, Atlas, Mode};

const LEGEND_TICKS: usize = 4;

pub fn tui_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

pub fn draw(f: &mut Frame<'_>, state: &mut AppState) {
    let Some(atlas) = state.atlas.as_ref() else {
        draw_unavailable(f, state.load_error.as_deref().unwrap_or(""));
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(22),
            Constraint::Percentage(53),
            Constraint::Percentage(25),
        ])
        .split(f.area());

    // left: selection list and help
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(8)])
        .split(chunks[0]);
    draw_selection_list(f, atlas, left[0]);
    let help = Paragraph::new(AppState::HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("Pomoc"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, left[1]);

    // centre: map and status line
    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(chunks[1]);
    let c = &atlas.controller;
    let scale = c.color_scale();
    let title = format!("Wypożyczenia na mieszkańca {} (×{:.1})", c.year(), atlas.map.zoom());
    atlas.map.render(
        f,
        center[0],
        &title,
        |code| tui_color(scale.color(c.metric(code))),
        |code| c.selection().is_selected(code),
    );
    draw_status_line(f, state, center[1]);

    // right: year, legend, chart
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(LEGEND_TICKS as u16 + 3),
            Constraint::Min(4),
        ])
        .split(chunks[2]);
    draw_year_slider(f, atlas, right[0]);
    draw_legend(f, atlas, right[1]);
    draw_bar_chart(f, atlas, right[2]);

    state.map_area = center[0];
}

fn draw_unavailable(f: &mut Frame<'_>, reason: &str) {
    let text = format!("Dane niedostępne.\n\n{reason}\n\nq: wyjście");
    let p = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Błąd"))
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, f.area());
}

fn draw_selection_list(f: &mut Frame<'_>, atlas: &Atlas, area: Rect) {
    let c = &atlas.controller;
    let year = c.year();
    let items: Vec<ListItem> = c
        .selection()
        .iter()
        .map(|e| ListItem::new(format!("{} ({})", e.name, e.metric(year))))
        .collect();
    let title = format!("Wybrane ({})", items.len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, area);
}

fn draw_status_line(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let line = match state.mode {
        Mode::Search => Line::from(vec![
            Span::styled("Szukaj: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(state.query.as_str()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Mode::Normal => match &state.hover {
            Some(name) => Line::from(Span::styled(name.as_str(), Style::default().fg(Color::Cyan))),
            None => Line::from(state.status.as_str()),
        },
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_year_slider(f: &mut Frame<'_>, atlas: &Atlas, area: Rect) {
    let ctx = atlas.controller.year_context();
    let years = ctx.years();
    let label = format!("{} ◀ {} ▶ {}", years.earliest(), ctx.current(), years.latest());
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Rok"))
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
        .ratio(ctx.position())
        .label(label);
    f.render_widget(gauge, area);
}

fn draw_legend(f: &mut Frame<'_>, atlas: &Atlas, area: Rect) {
    let scale = atlas.controller.color_scale();
    let mut lines: Vec<Line> = scale
        .ticks(LEGEND_TICKS)
        .into_iter()
        .map(|t| swatch(tui_color(scale.color(Metric::Value(t))), format!("{t:.1}")))
        .collect();
    lines.push(swatch(tui_color(scale.color(Metric::Absent)), "brak danych".to_string()));
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Legenda"));
    f.render_widget(p, area);
}

fn swatch(color: Color, text: String) -> Line<'static> {
    Line::from(vec![Span::styled("██ ", Style::default().fg(color)), Span::raw(text)])
}

/// Bar resolution: metric values are shown to two decimals.
const BAR_SCALE: f64 = 100.0;

fn draw_bar_chart(f: &mut Frame<'_>, atlas: &Atlas, area: Rect) {
    let c = &atlas.controller;
    let year = c.year();
    let scale = c.color_scale();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Porównanie {year}"));

    if c.selection().is_empty() {
        let p = Paragraph::new("Kliknij gminę na mapie lub wyszukaj ją (/)")
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
        return;
    }

    let bars: Vec<Bar> = c
        .selection()
        .iter()
        .map(|e| {
            let metric = e.metric(year);
            let value = metric.value().map_or(0, |v| (v.max(0.0) * BAR_SCALE).round() as u64);
            Bar::default()
                .label(Line::from(e.name.clone()))
                .value(value)
                .text_value(metric.to_string())
                .style(Style::default().fg(tui_color(scale.color(metric))))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max((scale.max() * BAR_SCALE).round() as u64)
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}
