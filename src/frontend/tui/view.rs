//! Rendering of [`TuiState`]. Pure functions of the state.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::state::{CredentialsForm, Editor, Message, Pane, RecordField, RecordForm, RecordsPane, TuiState};
use crate::cloudflare_api::{DnsRecord, RecordType};
use crate::constants::AUTO_TTL;
use crate::frontend::{MessageKind, Tone};

pub fn render(state: &TuiState, frame: &mut Frame) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(" Cloudflare DNS Manager ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(state.status.as_str(), Style::default().fg(Color::Yellow)),
    ]));
    frame.render_widget(title, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    render_domains(state, frame, columns[0]);
    render_records(state, frame, columns[1]);
    render_hints(state, frame, rows[2]);

    match &state.editor {
        Some(Editor::Credentials(form)) => render_credentials(form, frame),
        Some(Editor::Record(form)) => render_record_form(form, frame),
        Some(Editor::ConfirmDelete { name, .. }) => render_confirm_delete(name, frame),
        None => {}
    }

    if let Some(message) = &state.message {
        render_message(message, frame);
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn render_domains(state: &TuiState, frame: &mut Frame, area: Rect) {
    let block = pane_block(" Domains ", state.focus == Pane::Domains);

    if let Some(error) = &state.domain_error {
        let paragraph = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    if state.zones.is_empty() {
        let paragraph = Paragraph::new("No domains.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state
        .zones
        .iter()
        .map(|zone| ListItem::new(zone.name.as_str()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected_zone));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_records(state: &TuiState, frame: &mut Frame, area: Rect) {
    let block = pane_block(" Records ", state.focus == Pane::Records);

    let placeholder = match &state.records {
        RecordsPane::Idle => Some(("Select a domain to see its records.", Color::DarkGray)),
        RecordsPane::Loading => Some(("Loading...", Color::Yellow)),
        RecordsPane::Empty => Some(("No records.", Color::DarkGray)),
        RecordsPane::Failed(message) => Some((message.as_str(), Color::Red)),
        RecordsPane::Records(_) => None,
    };
    if let Some((text, color)) = placeholder {
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state.records.records().iter().map(record_line).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected_record));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn record_line(record: &DnsRecord) -> ListItem<'_> {
    let ttl = if record.ttl == AUTO_TTL {
        "auto".to_string()
    } else {
        record.ttl.to_string()
    };

    let mut spans = vec![
        Span::styled(format!("{:6}", record.dns_type.as_str()), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::raw(record.name.as_str()),
        Span::styled(" → ", Style::default().fg(Color::DarkGray)),
        Span::styled(record.content.as_str(), Style::default().fg(Color::Gray)),
        Span::styled(format!("  ttl {}", ttl), Style::default().fg(Color::DarkGray)),
    ];
    if record.proxied {
        spans.push(Span::styled("  proxied", Style::default().fg(Color::LightRed)));
    }

    ListItem::new(Line::from(spans))
}

fn render_hints(state: &TuiState, frame: &mut Frame, area: Rect) {
    let mut hints = vec![("↑↓", "Move"), ("Tab", "Switch pane"), ("Enter", "Open domain")];
    if state.record_controls {
        hints.push(("a", "Add"));
        hints.push(("d", "Delete"));
        hints.push(("r", "Refresh"));
    }
    hints.push(("R", "Reload domains"));
    hints.push(("c", "Credentials"));
    hints.push(("q", "Quit"));

    let mut spans = Vec::new();
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(*desc, Style::default().fg(Color::Gray)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered area for modals.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn modal_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Color::Black))
}

fn field_line<'a>(label: &'a str, value: String, focused: bool) -> Vec<Line<'a>> {
    let style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if focused { "▏" } else { "" };

    vec![
        Line::styled(label, Style::default().fg(Color::Gray)),
        Line::styled(format!("  {}{}", value, cursor), style),
    ]
}

fn status_line(status: &Option<(String, Tone)>) -> Line<'_> {
    match status {
        Some((message, Tone::Progress)) => Line::styled(message.as_str(), Style::default().fg(Color::Yellow)),
        Some((message, Tone::Failure)) => Line::styled(message.as_str(), Style::default().fg(Color::Red)),
        None => Line::from(""),
    }
}

fn render_credentials(form: &CredentialsForm, frame: &mut Frame) {
    let area = centered_rect(60, 11, frame.area());
    frame.render_widget(Clear, area);

    let masked = "•".repeat(form.api_key.chars().count());
    let mut lines = field_line("Email", form.email.clone(), form.focus == 0);
    lines.extend(field_line("Global API key", masked, form.focus == 1));
    lines.push(Line::from(""));
    lines.push(status_line(&form.status));
    lines.push(Line::styled(
        "Tab switch field · Enter verify and save · Esc cancel",
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(modal_block(" Cloudflare credentials ", Color::Cyan));
    frame.render_widget(paragraph, area);
}

fn render_record_form(form: &RecordForm, frame: &mut Frame) {
    let area = centered_rect(64, 15, frame.area());
    frame.render_widget(Clear, area);

    let record_type = form.record_type();
    let types = RecordType::EDITABLE
        .iter()
        .map(|t| {
            if *t == record_type {
                format!("[{}]", t)
            } else {
                format!(" {} ", t)
            }
        })
        .collect::<Vec<_>>()
        .join("");

    let mut lines = field_line("Type (←→)", types, form.focus == RecordField::Type);
    lines.extend(field_line("Name (@ for the domain itself)", form.name.clone(), form.focus == RecordField::Name));

    let content_label = if record_type.is_address() {
        "Content (blank = current public IP)"
    } else {
        "Content"
    };
    lines.extend(field_line(content_label, form.content.clone(), form.focus == RecordField::Content));

    let proxied = if !record_type.is_proxiable() {
        "n/a".to_string()
    } else if form.proxied {
        "[x] proxied".to_string()
    } else {
        "[ ] proxied".to_string()
    };
    lines.extend(field_line("Proxy (space)", proxied, form.focus == RecordField::Proxied));

    lines.push(status_line(&form.status));
    lines.push(Line::styled(
        "Tab next field · Enter add · Esc cancel",
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(modal_block(" Add record ", Color::Cyan));
    frame.render_widget(paragraph, area);
}

fn render_confirm_delete(name: &str, frame: &mut Frame) {
    let area = centered_rect(50, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(format!("Delete {}?", name)),
        Line::from(""),
        Line::styled("y delete · n keep", Style::default().fg(Color::DarkGray)),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(modal_block(" Confirm ", Color::Red));
    frame.render_widget(paragraph, area);
}

fn render_message(message: &Message, frame: &mut Frame) {
    let area = centered_rect(56, 8, frame.area());
    frame.render_widget(Clear, area);

    let color = match message.kind {
        MessageKind::Info => Color::Green,
        MessageKind::Error => Color::Red,
    };
    let title = format!(" {} ", message.title);
    let lines = vec![
        Line::from(message.body.as_str()),
        Line::from(""),
        Line::styled("Enter to close", Style::default().fg(Color::DarkGray)),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(modal_block(&title, color));
    frame.render_widget(paragraph, area);
}
