// crates/roulette-client/src/components/bet_entry.rs

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use roulette_core::Category;

use crate::app::{App, Field, InputMode};

const CATEGORIES: [Category; 4] = [Category::Straight, Category::Color, Category::Parity, Category::Dozen];

pub fn draw_bet_entry(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Place Bet ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.betting_open() {
            Color::Yellow
        } else {
            Color::White
        }));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Category
            Constraint::Length(2), // Pick
            Constraint::Length(2), // Stake
            Constraint::Min(3),    // This round
            Constraint::Length(1), // Actions
        ])
        .split(inner);

    let mut category_spans = vec![Span::raw("Category: ")];
    for category in CATEGORIES {
        let style = if category == app.category {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Gray)
        };
        category_spans.push(Span::styled(format!(" {} ", category.as_str()), style));
    }
    f.render_widget(
        Paragraph::new(Line::from(category_spans)).block(Block::default().borders(Borders::BOTTOM)),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(field_line(app, Field::Selector, "Pick: ", &app.selector_input))
            .block(Block::default().borders(Borders::BOTTOM)),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new(field_line(app, Field::Stake, "Stake: ", &app.stake_input))
            .block(Block::default().borders(Borders::BOTTOM)),
        chunks[2],
    );

    let mut items: Vec<ListItem> = app
        .my_bets
        .iter()
        .map(|bet| ListItem::new(format!("{:>6} on {} {}", bet.stake, bet.category.as_str(), bet.selector)))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(Span::styled("no bets yet", Style::default().fg(Color::DarkGray))));
    }
    let title = format!("This round (staked {})", app.total_staked());
    f.render_widget(
        List::new(items).block(Block::default().title(title).borders(Borders::BOTTOM)),
        chunks[3],
    );

    let actions_text = match app.input_mode {
        InputMode::Editing(_) => "[Enter] Done | [Esc] Cancel",
        InputMode::Normal if app.betting_open() => "[Enter] Place Bet",
        InputMode::Normal => "Betting closed",
    };
    f.render_widget(
        Paragraph::new(actions_text)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        chunks[4],
    );
}

fn field_line<'a>(app: &App, field: Field, label: &'a str, value: &'a str) -> Line<'a> {
    let editing = app.input_mode == InputMode::Editing(field);
    Line::from(vec![
        Span::raw(label),
        Span::styled(value, Style::default().fg(Color::Cyan)),
        if editing {
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK))
        } else {
            Span::raw("")
        },
    ])
}
