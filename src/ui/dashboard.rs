use crate::ui::app::{App, FocusPanel, InputMode};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table,
    },
    Frame,
};

const BRAND_DARK: Color = Color::Rgb(0x1F, 0x2F, 0x3C);
const BRAND_SELECT_BG: Color = Color::Rgb(0xC3, 0xD3, 0xE0);
const BRAND_GREEN: Color = Color::Rgb(0x82, 0x9A, 0x68);
const BRAND_ORANGE: Color = Color::Rgb(0x9E, 0x68, 0x3C);
const BRAND_MUTED: Color = Color::Rgb(0x71, 0x65, 0x65);

const HEADER_STYLE: Style = Style::new().fg(BRAND_DARK).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new()
    .bg(BRAND_SELECT_BG)
    .fg(BRAND_DARK)
    .add_modifier(Modifier::BOLD);
const EXPORT_COLOR: Color = BRAND_ORANGE;
const COUNT_COLOR: Color = BRAND_GREEN;

const DASHBOARD_HELP: &str =
    " ←→ Panel | ↑↓ Move | Enter Export target | v Volume | V Recompute | e Export | i Import | o Open | x Close | q Quit ";

pub fn draw_dashboard(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(10),   // Main content
        Constraint::Length(8), // Property sets
        Constraint::Length(3), // Status / input
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_property_sets(frame, chunks[2], app);
    draw_status(frame, chunks[3], app);
    draw_footer(frame, chunks[4], DASHBOARD_HELP);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let export_target = app
        .panel
        .selected()
        .and_then(|id| app.registry.get(id))
        .map_or_else(|| "none".to_string(), |m| m.name.clone());

    let title = format!(
        " IFC Quantities | {} model(s) | export: {} | {} element(s) annotated ",
        app.models.len(),
        export_target,
        app.annotator.processed().element_count()
    );

    let header = Paragraph::new(title)
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(25), // Models
        Constraint::Percentage(20), // Categories
        Constraint::Percentage(55), // Elements
    ])
    .split(area);

    draw_models(frame, chunks[0], app);
    draw_fragments(frame, chunks[1], app);
    draw_elements(frame, chunks[2], app);
}

fn focus_border(is_focused: bool) -> Style {
    if is_focused {
        Style::default().fg(BRAND_ORANGE)
    } else {
        Style::default()
    }
}

fn item_style(is_selected: bool, is_focused: bool) -> Style {
    if is_selected && is_focused {
        SELECTED_STYLE
    } else if is_selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_models(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Models;

    let items: Vec<ListItem> = app
        .models
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let is_selected = i == app.selected_model;
            let export_marker = if app.is_export_selection(&entry.id) {
                "● "
            } else {
                "  "
            };
            let focus_marker = if is_selected && is_focused { " ◄" } else { "" };

            ListItem::new(Line::from(vec![
                Span::styled(export_marker, Style::default().fg(EXPORT_COLOR)),
                Span::styled(entry.name.as_str(), item_style(is_selected, is_focused)),
                Span::styled(focus_marker, Style::default().fg(BRAND_ORANGE)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Models ({}) ", app.models.len()))
            .borders(Borders::ALL)
            .border_style(focus_border(is_focused)),
    );

    frame.render_widget(list, area);
}

fn draw_fragments(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Fragments;
    let fragments = app.current_model().map(|m| m.fragments.as_slice()).unwrap_or_default();

    let items: Vec<ListItem> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let is_selected = i == app.selected_fragment;
            let marker = if is_selected && is_focused { " ◄" } else { "" };

            ListItem::new(Line::from(vec![
                Span::styled(fragment.category.as_str(), item_style(is_selected, is_focused)),
                Span::raw(" "),
                Span::styled(
                    format!("({})", fragment.element_ids.len()),
                    Style::default().fg(COUNT_COLOR),
                ),
                Span::styled(marker, Style::default().fg(BRAND_ORANGE)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Categories ")
            .borders(Borders::ALL)
            .border_style(focus_border(is_focused)),
    );

    frame.render_widget(list, area);
}

fn draw_elements(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Elements;
    let elements = app.element_rows();

    let category = app
        .current_fragment()
        .map(|f| f.category.clone())
        .unwrap_or_default();

    // Borders plus the header row.
    let visible_rows = (area.height as usize).saturating_sub(3);
    let scroll_offset = if app.selected_element >= visible_rows {
        app.selected_element - visible_rows + 1
    } else {
        0
    };

    let header = Row::new(vec!["ID", "Name", "Level", "Volume (m³)"])
        .style(HEADER_STYLE)
        .height(1);

    let rows: Vec<Row> = elements
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows)
        .map(|(i, row)| {
            let volume = row
                .volume
                .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
            let name = if row.name.is_empty() {
                row.entity_type.clone()
            } else {
                row.name.clone()
            };

            Row::new(vec![format!("#{}", row.id), name, row.storey.clone(), volume])
                .style(item_style(i == app.selected_element, is_focused))
        })
        .collect();

    let widths = [
        Constraint::Percentage(14),
        Constraint::Percentage(44),
        Constraint::Percentage(22),
        Constraint::Percentage(20),
    ];

    let title = format!(" {} ({} elements) ", category, elements.len());
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(focus_border(is_focused)),
    );

    frame.render_widget(table, area);

    if elements.len() > visible_rows {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        let mut scrollbar_state = ScrollbarState::new(elements.len()).position(app.selected_element);

        let scrollbar_area = Rect {
            x: area.x + area.width - 1,
            y: area.y + 2,
            width: 1,
            height: area.height.saturating_sub(3),
        };
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

fn draw_property_sets(frame: &mut Frame, area: Rect, app: &App) {
    let psets = app.current_property_sets();
    let mut rows: Vec<Row> = Vec::new();

    for pset in &psets {
        rows.push(
            Row::new(vec![format!("── {} ──", pset.name), String::new()]).style(
                Style::default()
                    .fg(BRAND_MUTED)
                    .add_modifier(Modifier::ITALIC),
            ),
        );
        for (name, value) in &pset.properties {
            rows.push(Row::new(vec![name.clone(), value.clone()]));
        }
    }

    let title = app
        .current_element_id()
        .map_or_else(|| " Properties ".to_string(), |id| format!(" Properties of #{id} "));

    let widths = [Constraint::Percentage(40), Constraint::Percentage(60)];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Property", "Value"]).style(HEADER_STYLE))
        .block(Block::default().title(title).borders(Borders::ALL));

    frame.render_widget(table, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App) {
    let (label, text) = match app.input_mode {
        InputMode::Normal => (" Status ", app.status.clone()),
        InputMode::Import => (" Import IFC file (Enter to process, Esc to cancel) ", format!("{}▏", app.input)),
        InputMode::Open => (" Open IFC model (Enter to load, Esc to cancel) ", format!("{}▏", app.input)),
    };

    let border_style = if app.input_mode == InputMode::Normal {
        Style::default()
    } else {
        Style::default().fg(BRAND_ORANGE)
    };

    let status = Paragraph::new(text).block(
        Block::default()
            .title(label)
            .borders(Borders::ALL)
            .border_style(border_style),
    );

    frame.render_widget(status, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, help: &str) {
    let footer = Paragraph::new(help)
        .style(Style::default().fg(BRAND_MUTED))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}
