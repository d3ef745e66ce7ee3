// crates/roulette-client/src/ui.rs

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::components::{
    activity_log::draw_activity_log, bet_entry::draw_bet_entry, help::draw_help,
    player_list::draw_player_list, status_bar::draw_status_bar, wheel::draw_wheel,
};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(12),   // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    draw_header(f, chunks[0], app);
    draw_main_content(f, chunks[1], app);
    draw_status_bar(f, chunks[2], app);

    if app.show_help {
        draw_help(f, centered_rect(60, 60, f.size()));
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    // Left: who we are and whether we're connected
    let connection_symbol = if app.connected { "✓" } else { "✗" };
    let connection_color = if app.connected { Color::Green } else { Color::Red };
    let shown = app.my_display_name().unwrap_or_else(|| app.name.clone());

    let left_text = vec![
        Span::styled(shown, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw("Connected "),
        Span::styled(connection_symbol, Style::default().fg(connection_color)),
    ];
    f.render_widget(
        Paragraph::new(Line::from(left_text)).block(Block::default().borders(Borders::ALL)),
        header_chunks[0],
    );

    // Center: balance
    let center_text = format!("Balance: {}", app.balance);
    f.render_widget(
        Paragraph::new(center_text)
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL)),
        header_chunks[1],
    );

    let help_text = "[F1]Help [Tab]Category [Q]uit";
    f.render_widget(
        Paragraph::new(help_text)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL)),
        header_chunks[2],
    );
}

fn draw_main_content(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35), // Wheel
            Constraint::Percentage(35), // Bet entry
            Constraint::Percentage(30), // Players and activity
        ])
        .split(area);

    draw_wheel(f, chunks[0], app);
    draw_bet_entry(f, chunks[1], app);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);

    draw_player_list(f, right_chunks[0], app);
    draw_activity_log(f, right_chunks[1], app);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
