// crates/roulette-client/src/components/activity_log.rs

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::{App, Tone};

pub fn draw_activity_log(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .activity
        .iter()
        .take(visible)
        .map(|entry| {
            let color = match entry.tone {
                Tone::Info => Color::White,
                Tone::Good => Color::Green,
                Tone::Bad => Color::Red,
            };
            ListItem::new(Line::from(vec![
                Span::styled(entry.at.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::styled(entry.text.clone(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().title(" Activity ").borders(Borders::ALL));
    f.render_widget(list, area);
}
