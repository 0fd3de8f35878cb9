use crate::model::ItemStatus;
use crate::tui::state::{AppState, InputMode};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

fn column_color(status: ItemStatus) -> Color {
    match status {
        ItemStatus::ToPack => Color::Yellow,
        ItemStatus::Packed => Color::Cyan,
        ItemStatus::Delivered => Color::Green,
    }
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    // --- Title bar ---
    let progress = state.board.progress();
    let title = match &state.checklist {
        Some(c) => c.title.clone(),
        None if state.loading => "Loading...".to_string(),
        None => "No checklist".to_string(),
    };
    let mut header = vec![
        Span::styled(
            format!(" {} ", title),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {} items | packed {}% | delivered {}%",
            progress.total, progress.packed.percent, progress.delivered.percent
        )),
    ];
    if state.unread_alerts > 0 {
        header.push(Span::styled(
            format!(" | {} new alerts", state.unread_alerts),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(header)), v_chunks[0]);

    // --- Columns ---
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(v_chunks[1]);

    let grabbed = state.drag.grabbed().map(str::to_string);
    for status in ItemStatus::ALL {
        let items: Vec<ListItem> = state
            .board
            .column(status)
            .iter()
            .map(|item| {
                let mut style = Style::default();
                if grabbed.as_deref() == Some(item.id.as_str()) {
                    style = style.fg(Color::Magenta).add_modifier(Modifier::ITALIC);
                }
                let who = item
                    .assignee
                    .as_ref()
                    .map(|a| format!(" @{}", a))
                    .unwrap_or_default();
                let line = format!("{} #{}{}", item.name, item.category, who);
                ListItem::new(Line::from(vec![Span::styled(line, style)]))
            })
            .collect();

        let focused = state.column == status;
        let border_style = if focused && grabbed.is_some() {
            Style::default().fg(Color::Magenta)
        } else if focused {
            Style::default().fg(column_color(status))
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ({}) ", status, state.board.column(status).len()))
                    .border_style(border_style),
            )
            .highlight_style(if focused {
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .bg(Color::DarkGray)
            } else {
                Style::default()
            });
        f.render_stateful_widget(list, cols[status.index()], &mut state.column_states[status.index()]);
    }

    // --- Details Pane ---
    let details_text = match state.selected_item() {
        Some(item) if item.description.is_empty() => "No description".to_string(),
        Some(item) => item.description.clone(),
        None => String::new(),
    };
    let details = Paragraph::new(details_text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    f.render_widget(details, v_chunks[2]);

    if state.mode == InputMode::ReviewingSuggestions {
        draw_suggestions(f, state, v_chunks[1]);
    }

    // --- Footer / Input ---
    let footer_area = v_chunks[3];
    match state.mode {
        InputMode::Creating
        | InputMode::Editing
        | InputMode::Suggesting
        | InputMode::NamingChecklist
        | InputMode::RetitlingChecklist => {
            let (title, prefix, color) = match state.mode {
                InputMode::Editing => (" Edit Item ", "> ", Color::Magenta),
                InputMode::NamingChecklist => (" New Checklist ", "+ ", Color::Cyan),
                InputMode::RetitlingChecklist => (" Rename Checklist ", "+ ", Color::Cyan),
                InputMode::Suggesting => (
                    " Trip: type, destination, days, group ",
                    "? ",
                    Color::Green,
                ),
                _ => (
                    " New Item: name; category=; status=; assignee=; desc= ",
                    "> ",
                    Color::Yellow,
                ),
            };
            let input = Paragraph::new(format!("{}{}", prefix, state.input_buffer))
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(input, footer_area);
            let cursor_x =
                footer_area.x + 1 + prefix.chars().count() as u16 + state.cursor_position as u16;
            let cursor_y = footer_area.y + 1;
            f.set_cursor_position((cursor_x, cursor_y));
        }
        InputMode::Normal | InputMode::ReviewingSuggestions => {
            let f_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(footer_area);
            let status_color = if state.message.starts_with("Error") {
                Color::Red
            } else {
                Color::Cyan
            };
            let status = Paragraph::new(state.message.clone())
                .style(Style::default().fg(status_color))
                .block(
                    Block::default()
                        .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
                        .title(" Status "),
                );
            let help_text = if state.mode == InputMode::ReviewingSuggestions {
                "Space:Pick | Tab:Status | Enter:Add picked | Esc:Discard"
            } else if state.drag.is_dragging() {
                "h/l:Column | Space:Drop | Esc:Cancel"
            } else {
                "a:Add | e:Edit | d:Del | Space:Grab | s:Suggest | c/n/t/X:List | o:Progress | m:Read | r:Reload | q:Quit"
            };
            let help = Paragraph::new(help_text)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Right)
                .block(
                    Block::default()
                        .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
                        .title(" Actions "),
                );
            f.render_widget(status, f_chunks[0]);
            f.render_widget(help, f_chunks[1]);
        }
    }
}

fn draw_suggestions(f: &mut Frame, state: &mut AppState, area: Rect) {
    let popup = Rect {
        x: area.x + area.width / 6,
        y: area.y + 1,
        width: area.width * 2 / 3,
        height: area.height.saturating_sub(2),
    };
    let lines: Vec<ListItem> = if state.suggestions.is_empty() {
        vec![ListItem::new("No suggestions found. Try changing your trip details.")]
    } else {
        state
            .suggestions
            .iter()
            .zip(&state.suggestion_picked)
            .map(|(s, picked)| {
                let mark = if *picked { "[x] " } else { "[ ] " };
                ListItem::new(Line::from(vec![
                    Span::raw(mark),
                    Span::styled(s.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", s.reason), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect()
    };
    let list = List::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Suggestions: add as {} ", state.suggestion_status))
                .border_style(Style::default().fg(Color::Green)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    f.render_widget(Clear, popup);
    f.render_stateful_widget(list, popup, &mut state.suggestion_list);
}
