// crates/roulette-client/src/components/player_list.rs

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::app::App;

pub fn draw_player_list(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(vec!["", "Player", "Balance"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .players
        .values()
        .map(|player| {
            let me = app.identity.as_ref() == Some(&player.identity);
            let (dot, dot_style) = if player.connected {
                ("●", Style::default().fg(Color::Green))
            } else {
                ("○", Style::default().fg(Color::DarkGray))
            };
            let name_style = if me {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(dot).style(dot_style),
                Cell::from(player.name.clone()).style(name_style),
                Cell::from(player.balance.to_string()),
            ])
        })
        .collect();

    let online = app.players.values().filter(|p| p.connected).count();
    let table = Table::new(
        rows,
        [Constraint::Length(2), Constraint::Min(12), Constraint::Length(10)],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" Players ({online} online) "))
            .borders(Borders::ALL),
    );

    f.render_widget(table, area);
}
