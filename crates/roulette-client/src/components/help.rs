// crates/roulette-client/src/components/help.rs

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

const SHORTCUTS: [(&str, &str, Color); 12] = [
    ("Enter/Space", "Place the bet in the form", Color::Green),
    ("Tab", "Next bet category", Color::Blue),
    ("E/e", "Type the pick (number, red, odd, first...)", Color::Yellow),
    ("T/t", "Type the stake", Color::Yellow),
    ("+/-", "Raise or lower the stake", Color::Magenta),
    ("R/r", "Pick red", Color::Red),
    ("K/k", "Pick black", Color::White),
    ("V/v", "Pick even", Color::Cyan),
    ("O/o", "Pick odd", Color::Cyan),
    ("1/2/3", "Pick a dozen", Color::Cyan),
    ("F1/?", "Toggle Help", Color::Gray),
    ("Q/q", "Quit", Color::Red),
];

pub fn draw_help(f: &mut Frame, area: Rect) {
    // Clear the area first for the overlay
    f.render_widget(Clear, area);

    let help_items: Vec<ListItem> = SHORTCUTS
        .iter()
        .map(|(keys, what, color)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{keys:>11}"), Style::default().fg(*color).add_modifier(Modifier::BOLD)),
                Span::raw(format!(" - {what}")),
            ]))
        })
        .collect();

    let help_list = List::new(help_items).block(
        Block::default()
            .title(" Help - Keyboard Shortcuts ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(help_list, area);

    let footer = Paragraph::new("Press F1, ? or ESC to close help")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);

    let footer_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    f.render_widget(footer, footer_area);
}
