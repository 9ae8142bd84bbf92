use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, Mode};
use crate::config::Theme;
use crate::model::{ContainerRecord, format_age};

const FILTER_PLACEHOLDER: &str = "Type to filter containers...";
const BROWSE_HELP: &str =
    "↑↓: navigate • /: filter • r: refresh • s: start • x: stop • d: delete • q: quit";
const FILTER_HELP: &str = "Enter: apply filter • Esc: cancel • Ctrl+C: quit";
const HEADERS: [&str; 5] = ["ID", "NAME", "IMAGE", "STATUS", "PORTS"];

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    if let Some(error) = app.fatal_error() {
        render_fatal(frame, frame.area(), error, theme);
        return;
    }

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(Paragraph::new(build_title_line(app, theme)), root[0]);
    frame.render_widget(Paragraph::new(build_filter_line(app, theme)), root[1]);
    frame.render_widget(Paragraph::new(build_status_line(app, theme)), root[2]);
    render_table(frame, root[3], app, theme);
    frame.render_widget(Paragraph::new(build_help_line(app, theme)), root[4]);
}

fn render_fatal(frame: &mut Frame, area: Rect, error: &str, theme: &Theme) {
    let paragraph = Paragraph::new(format!("Error: {error}"))
        .style(theme.error)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn build_title_line(app: &App, theme: &Theme) -> Line<'static> {
    let total = app.records().len();
    let mut spans = vec![
        Span::styled("🐳 Container Manager", theme.title),
        Span::raw(format!(" ({total} containers)")),
    ];
    if !app.filter().is_empty() {
        spans.push(Span::styled(
            format!(" · {} shown", app.rows().len()),
            theme.help,
        ));
    }
    if let Some(refreshed) = app.last_refreshed() {
        spans.push(Span::styled(
            format!(" · refreshed {}", refreshed.format("%H:%M:%S")),
            theme.help,
        ));
    }
    if app.loading() {
        spans.push(Span::styled(" · working…", theme.info));
    }
    Line::from(spans)
}

fn build_filter_line(app: &App, theme: &Theme) -> Line<'static> {
    match app.mode() {
        Mode::Filtering => {
            let mut spans = vec![Span::styled("Filter: ", theme.filter)];
            if app.filter().is_empty() {
                spans.push(Span::styled("█", theme.filter));
                spans.push(Span::styled(FILTER_PLACEHOLDER, theme.help));
            } else {
                spans.push(Span::raw(app.filter().to_string()));
                spans.push(Span::styled("█", theme.filter));
            }
            Line::from(spans)
        }
        _ if !app.filter().is_empty() => Line::from(Span::styled(
            format!("Filter: {}", app.filter()),
            theme.filter,
        )),
        _ => Line::default(),
    }
}

fn build_status_line(app: &App, theme: &Theme) -> Line<'static> {
    if let Some(status) = app.status() {
        return Line::from(Span::styled(
            status.text.clone(),
            theme.status_kind(status.kind),
        ));
    }

    match app.selected_container() {
        Some(record) => Line::from(Span::styled(selected_summary(record), theme.help)),
        None => Line::default(),
    }
}

fn selected_summary(record: &ContainerRecord) -> String {
    let mut parts = vec![record.display_name().to_string()];
    if !record.status.is_empty() {
        parts.push(record.status.clone());
    }
    parts.push(format!("created {}", format_age(&record.created, Local::now())));
    if !record.command.is_empty() {
        parts.push(record.command.clone());
    }
    parts.join(" · ")
}

fn build_help_line(app: &App, theme: &Theme) -> Line<'static> {
    let text = match app.mode() {
        Mode::Filtering => FILTER_HELP,
        _ => BROWSE_HELP,
    };
    Line::from(Span::styled(text, theme.help))
}

fn render_table(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let widths = app.layout().columns.as_array();

    let header_row = Row::new(
        HEADERS
            .iter()
            .map(|header| Cell::from(*header).style(theme.header)),
    )
    .height(1);

    let rows = app.rows().iter().map(|row| {
        Row::new(vec![
            Cell::from(row.id.clone()),
            Cell::from(row.name.clone()),
            Cell::from(row.image.clone()),
            Cell::from(row.status.label.clone()).style(theme.status_tone(row.status.tone)),
            Cell::from(row.ports.clone()),
        ])
    });

    let constraints = widths
        .iter()
        .map(|width| Constraint::Length(u16::try_from(*width).unwrap_or(u16::MAX)))
        .collect::<Vec<_>>();

    let block = Block::default()
        .title(format!("Containers ({})", app.rows().len()))
        .borders(Borders::ALL)
        .border_style(theme.border);

    let table = Table::new(rows, constraints)
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(theme.selected);

    let mut state = TableState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}
