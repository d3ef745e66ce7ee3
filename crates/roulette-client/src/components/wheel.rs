// crates/roulette-client/src/components/wheel.rs

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use roulette_core::{Outcome, Phase};

use crate::app::{describe_outcome, App};

/// Betting window the gauge is scaled against.
const BETTING_SECS: u32 = 20;

pub fn draw_wheel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Wheel ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Phase
            Constraint::Length(1), // Countdown
            Constraint::Length(3), // Outcome
            Constraint::Length(1), // Personal result
            Constraint::Min(1),    // History
        ])
        .split(inner);

    let (label, color) = match app.phase {
        Some(Phase::Betting) => ("PLACE YOUR BETS", Color::Green),
        Some(Phase::Drawing) => ("NO MORE BETS", Color::Yellow),
        Some(Phase::Settling) => ("RESULTS", Color::Cyan),
        None => ("WAITING", Color::DarkGray),
    };
    f.render_widget(
        Paragraph::new(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
            .alignment(Alignment::Center),
        chunks[0],
    );

    if let (Some(Phase::Betting), Some(seconds)) = (app.phase, app.countdown) {
        let ratio = f64::from(seconds.min(BETTING_SECS)) / f64::from(BETTING_SECS);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(ratio)
            .label(format!("{seconds}s"));
        f.render_widget(gauge, chunks[1]);
    }

    let outcome = match app.outcome {
        Some(number) => Line::from(Span::styled(
            describe_outcome(number).to_uppercase(),
            pocket_style(number).add_modifier(Modifier::BOLD),
        )),
        None if app.phase == Some(Phase::Drawing) => Line::from("spinning..."),
        None => Line::from(""),
    };
    f.render_widget(
        Paragraph::new(outcome)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP | Borders::BOTTOM)),
        chunks[2],
    );

    if let Some(result) = &app.last_result {
        if !result.payouts.is_empty() {
            let net = result.net();
            let style = if net >= 0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            let text = format!(
                "{}: staked {} returned {} net {net:+}",
                describe_outcome(result.outcome),
                result.staked(),
                result.total_returned
            );
            f.render_widget(Paragraph::new(Span::styled(text, style)).alignment(Alignment::Center), chunks[3]);
        }
    }

    let mut history = vec![Span::raw("Last: ")];
    for number in &app.history {
        history.push(Span::styled(format!("{number:>2} "), pocket_style(*number)));
    }
    f.render_widget(Paragraph::new(Line::from(history)), chunks[4]);
}

fn pocket_style(number: u8) -> Style {
    match Outcome::new(number).and_then(Outcome::color) {
        Some(roulette_core::Color::Red) => Style::default().fg(Color::Red),
        Some(roulette_core::Color::Black) => Style::default().fg(Color::White),
        None => Style::default().fg(Color::Green),
    }
}
