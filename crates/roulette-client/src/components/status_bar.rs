// crates/roulette-client/src/components/status_bar.rs

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Field, InputMode};

pub fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (msg, style) = match app.input_mode {
        InputMode::Normal => {
            let shortcuts = vec![
                Span::styled("[Enter]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::raw("Bet "),
                Span::styled("[Tab]", Style::default().fg(Color::Cyan)),
                Span::raw("Category "),
                Span::styled("[E]", Style::default().fg(Color::Yellow)),
                Span::raw("dit pick "),
                Span::styled("[T]", Style::default().fg(Color::Yellow)),
                Span::raw("ype stake "),
                Span::styled("[+/-]", Style::default().fg(Color::Magenta)),
                Span::raw("Stake "),
                Span::styled("[Q]", Style::default().fg(Color::Gray)),
                Span::raw("uit"),
            ];
            (Line::from(shortcuts), Style::default())
        }
        InputMode::Editing(field) => {
            let (label, buffer) = match field {
                Field::Selector => ("Pick: ", &app.selector_input),
                Field::Stake => ("Stake: ", &app.stake_input),
            };
            let input = vec![
                Span::raw(label),
                Span::styled(buffer.as_str(), Style::default().fg(Color::Yellow)),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                Span::raw(" [Enter] Done [Esc] Cancel"),
            ];
            (Line::from(input), Style::default().fg(Color::Yellow))
        }
    };

    let status_block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(Span::styled(format!(" {} ", app.status), Style::default().fg(Color::Gray)));

    let paragraph = Paragraph::new(msg)
        .block(status_block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}
