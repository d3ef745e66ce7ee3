// crates/roulette-client/src/app.rs

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use roulette_core::{Category, Color, Outcome, ParticipantId, ParticipantSummary, Phase};
use roulette_protocol::{InboundAction, OutboundEvent, PayoutLine};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::session::{self, SavedSession};
use crate::types::{ClientConfig, NetworkEvent};

const ACTIVITY_LEN: usize = 200;
const STAKE_STEP: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing(Field),
}

/// Bet form field being typed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Selector,
    Stake,
}

/// One of our accepted wagers in the live round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyBet {
    pub category: Category,
    pub selector: String,
    pub stake: u64,
}

/// Our personal outcome of the last settled round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub outcome: u8,
    pub payouts: Vec<PayoutLine>,
    pub total_returned: u64,
}

impl RoundSummary {
    pub fn staked(&self) -> u64 {
        self.payouts.iter().fold(0u64, |sum, p| sum.saturating_add(p.stake))
    }

    /// Net result of the round, negative when we lost money.
    pub fn net(&self) -> i128 {
        i128::from(self.total_returned) - i128::from(self.staked())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Good,
    Bad,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub tone: Tone,
    pub text: String,
}

pub struct App {
    // Connection state
    pub connected: bool,
    pub status: String,
    pub identity: Option<ParticipantId>,
    pub name: String,
    pub balance: u64,

    // UI state
    pub input_mode: InputMode,
    pub should_quit: bool,
    pub show_help: bool,

    // Round state
    pub phase: Option<Phase>,
    pub countdown: Option<u32>,
    pub outcome: Option<u8>,
    pub history: Vec<u8>,
    pub my_bets: Vec<MyBet>,
    pub last_result: Option<RoundSummary>,

    // Table state
    pub players: IndexMap<ParticipantId, ParticipantSummary>,
    pub activity: VecDeque<LogEntry>,

    // Bet form
    pub category: Category,
    pub selector_input: String,
    pub stake_input: String,
    edit_backup: String,

    pub network_tx: Option<UnboundedSender<InboundAction>>,
    session_path: PathBuf,
}

impl App {
    pub fn new(config: &ClientConfig, saved: SavedSession) -> Self {
        Self {
            connected: false,
            status: "Connecting...".to_string(),
            identity: saved.identity.map(ParticipantId::from),
            name: saved.name.unwrap_or_else(|| config.name.clone()),
            balance: 0,
            input_mode: InputMode::Normal,
            should_quit: false,
            show_help: false,
            phase: None,
            countdown: None,
            outcome: None,
            history: Vec::new(),
            my_bets: Vec::new(),
            last_result: None,
            players: IndexMap::new(),
            activity: VecDeque::with_capacity(ACTIVITY_LEN),
            category: Category::Color,
            selector_input: "red".to_string(),
            stake_input: config.default_stake.to_string(),
            edit_backup: String::new(),
            network_tx: None,
            session_path: config.session_file.clone(),
        }
    }

    pub fn set_network_sender(&mut self, tx: UnboundedSender<InboundAction>) {
        self.network_tx = Some(tx);
    }

    fn send(&mut self, action: InboundAction) {
        let Some(tx) = &self.network_tx else {
            return;
        };
        if tx.send(action).is_err() {
            self.log(Tone::Bad, "network task is gone");
        }
    }

    pub fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected => {
                self.connected = true;
                self.status = "Connected".to_string();
                self.log(Tone::Info, "connected to server");
                self.identify();
            }
            NetworkEvent::Disconnected(reason) => {
                if self.connected {
                    self.log(Tone::Bad, format!("disconnected: {reason}"));
                }
                self.connected = false;
                self.status = format!("Disconnected ({reason}), retrying");
                self.phase = None;
                self.countdown = None;
            }
            NetworkEvent::Message(event) => self.handle_server_event(event),
        }
    }

    /// Resume the saved identity if there is one, else join fresh.
    fn identify(&mut self) {
        let action = match &self.identity {
            Some(identity) => InboundAction::Reconnect {
                identity: identity.to_string(),
                name: self.name.clone(),
            },
            None => InboundAction::SetName {
                name: self.name.clone(),
            },
        };
        self.send(action);
    }

    pub fn handle_server_event(&mut self, event: OutboundEvent) {
        debug!("Server event: {}", event.kind());
        match event {
            OutboundEvent::Welcome {
                identity,
                balance,
                history,
                players,
            } => {
                if self.identity.as_ref() != Some(&identity) && self.identity.is_some() {
                    self.log(Tone::Bad, "previous session expired, starting fresh");
                }
                self.identity = Some(identity);
                self.balance = balance;
                self.history = history;
                self.players = players.into_iter().map(|p| (p.identity.clone(), p)).collect();
                let shown = self.my_display_name().unwrap_or_else(|| self.name.clone());
                self.log(Tone::Good, format!("welcome, {shown}! balance {balance}"));
                self.persist();
            }

            OutboundEvent::GameState {
                phase,
                outcome,
                countdown,
                history,
            } => {
                if phase == Phase::Betting && self.phase != Some(Phase::Betting) {
                    self.my_bets.clear();
                    self.outcome = None;
                }
                self.phase = Some(phase);
                self.countdown = countdown;
                self.history = history;
                if let Some(number) = outcome {
                    self.outcome = Some(number);
                }
                if phase == Phase::Drawing {
                    self.log(Tone::Info, "no more bets");
                }
            }

            OutboundEvent::Countdown {
                phase,
                seconds_remaining,
            } => {
                self.phase = Some(phase);
                self.countdown = Some(seconds_remaining);
            }

            OutboundEvent::BetAccepted {
                category,
                selector,
                stake,
                balance,
            } => {
                self.balance = balance;
                self.log(Tone::Good, format!("bet accepted: {stake} on {} {selector}", category.as_str()));
                self.my_bets.push(MyBet {
                    category,
                    selector,
                    stake,
                });
            }

            OutboundEvent::BetRejected { reason } => {
                self.log(Tone::Bad, format!("bet rejected: {reason}"));
            }

            OutboundEvent::BetPlaced {
                identity,
                name,
                category,
                selector,
                stake,
            } => {
                if self.identity.as_ref() != Some(&identity) {
                    self.log(Tone::Info, format!("{name} bet {stake} on {} {selector}", category.as_str()));
                }
            }

            OutboundEvent::RoundResult {
                outcome,
                payouts,
                total_returned,
                balance,
            } => {
                self.balance = balance;
                self.outcome = Some(outcome);
                let summary = RoundSummary {
                    outcome,
                    payouts,
                    total_returned,
                };
                if !summary.payouts.is_empty() {
                    let net = summary.net();
                    let tone = if net >= 0 { Tone::Good } else { Tone::Bad };
                    self.log(tone, format!("{} came up, net {net:+}", describe_outcome(outcome)));
                }
                self.last_result = Some(summary);
            }

            OutboundEvent::PlayerList { players } => {
                self.players = players.into_iter().map(|p| (p.identity.clone(), p)).collect();
            }

            OutboundEvent::PlayerJoined { player } => {
                let is_me = self.identity.as_ref() == Some(&player.identity);
                if !is_me {
                    self.log(Tone::Info, format!("{} joined", player.name));
                }
                self.players.insert(player.identity.clone(), player);
            }

            OutboundEvent::PlayerLeft { identity } => {
                if let Some(player) = self.players.get_mut(&identity) {
                    player.connected = false;
                    let name = player.name.clone();
                    self.log(Tone::Info, format!("{name} left"));
                }
            }

            OutboundEvent::PlayerBalanceUpdated { identity, balance } => {
                if let Some(player) = self.players.get_mut(&identity) {
                    player.balance = balance;
                }
                if self.identity.as_ref() == Some(&identity) {
                    self.balance = balance;
                }
            }

            OutboundEvent::Ping => {}
        }
    }

    fn persist(&mut self) {
        let saved = SavedSession {
            identity: self.identity.as_ref().map(|id| id.to_string()),
            name: Some(self.name.clone()),
        };
        if let Err(e) = session::save(&self.session_path, &saved) {
            warn!("Failed to save session: {}", e);
            self.log(Tone::Bad, format!("could not save session: {e}"));
        }
    }

    pub fn my_display_name(&self) -> Option<String> {
        let identity = self.identity.as_ref()?;
        self.players.get(identity).map(|p| p.name.clone())
    }

    pub fn betting_open(&self) -> bool {
        self.connected && self.phase == Some(Phase::Betting)
    }

    pub fn total_staked(&self) -> u64 {
        self.my_bets.iter().map(|b| b.stake).sum()
    }

    // ------------------------------------------------------------------
    // Bet form
    // ------------------------------------------------------------------

    pub fn next_category(&mut self) {
        self.category = match self.category {
            Category::Straight => Category::Color,
            Category::Color => Category::Parity,
            Category::Parity => Category::Dozen,
            Category::Dozen => Category::Straight,
        };
        self.selector_input = default_selector(self.category).to_string();
    }

    /// Pick category and selector in one keystroke.
    pub fn quick_select(&mut self, category: Category, selector: &str) {
        self.category = category;
        self.selector_input = selector.to_string();
    }

    pub fn adjust_stake(&mut self, up: bool) {
        let current = self.stake_input.trim().parse::<u64>().unwrap_or(0);
        let next = if up {
            current.saturating_add(STAKE_STEP)
        } else {
            current.saturating_sub(STAKE_STEP).max(STAKE_STEP)
        };
        self.stake_input = next.to_string();
    }

    pub fn start_editing(&mut self, field: Field) {
        self.input_mode = InputMode::Editing(field);
        self.edit_backup = std::mem::take(self.input_buffer_mut());
    }

    /// Leave the field as it was before editing started.
    pub fn cancel_input(&mut self) {
        if matches!(self.input_mode, InputMode::Editing(_)) {
            let previous = std::mem::take(&mut self.edit_backup);
            *self.input_buffer_mut() = previous;
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn finish_input(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn enter_char(&mut self, c: char) {
        if let InputMode::Editing(field) = self.input_mode {
            if field == Field::Stake && !c.is_ascii_digit() {
                return;
            }
            self.input_buffer_mut().push(c);
        }
    }

    pub fn delete_char(&mut self) {
        if matches!(self.input_mode, InputMode::Editing(_)) {
            self.input_buffer_mut().pop();
        }
    }

    fn input_buffer_mut(&mut self) -> &mut String {
        match self.input_mode {
            InputMode::Editing(Field::Stake) => &mut self.stake_input,
            _ => &mut self.selector_input,
        }
    }

    /// Send the bet form as a `place_bet`. The server validates; the
    /// form is only checked for a usable stake.
    pub fn place_bet(&mut self) {
        if !self.connected {
            self.log(Tone::Bad, "not connected");
            return;
        }
        let Ok(stake) = self.stake_input.trim().parse::<i64>() else {
            self.log(Tone::Bad, format!("stake '{}' is not a number", self.stake_input));
            return;
        };
        let action = InboundAction::PlaceBet {
            category: self.category.as_str().to_string(),
            selector: self.selector_input.trim().to_lowercase(),
            stake,
        };
        self.send(action);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn log(&mut self, tone: Tone, text: impl Into<String>) {
        self.activity.push_front(LogEntry {
            at: Local::now(),
            tone,
            text: text.into(),
        });
        if self.activity.len() > ACTIVITY_LEN {
            self.activity.pop_back();
        }
    }
}

fn default_selector(category: Category) -> &'static str {
    match category {
        Category::Straight => "17",
        Category::Color => "red",
        Category::Parity => "even",
        Category::Dozen => "first",
    }
}

/// "17 red", "0 green" and so on.
pub fn describe_outcome(number: u8) -> String {
    let color = Outcome::new(number).and_then(Outcome::color);
    match color {
        Some(Color::Red) => format!("{number} red"),
        Some(Color::Black) => format!("{number} black"),
        None => format!("{number} green"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn app_with(saved: SavedSession, file: &str) -> (App, mpsc::UnboundedReceiver<InboundAction>) {
        let config = ClientConfig {
            name: "Ann".into(),
            session_file: std::env::temp_dir().join(format!(
                "roulette-app-{}-{file}.toml",
                std::process::id()
            )),
            ..ClientConfig::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(&config, saved);
        app.set_network_sender(tx);
        (app, rx)
    }

    fn summary(identity: &str, name: &str, balance: u64) -> ParticipantSummary {
        ParticipantSummary {
            identity: ParticipantId::from(identity),
            name: name.into(),
            balance,
            connected: true,
        }
    }

    #[test]
    fn fresh_client_joins_with_its_name() {
        let (mut app, mut rx) = app_with(SavedSession::default(), "fresh");
        app.handle_network_event(NetworkEvent::Connected);
        assert_eq!(rx.try_recv().unwrap(), InboundAction::SetName { name: "Ann".into() });
    }

    #[test]
    fn saved_identity_is_resumed() {
        let saved = SavedSession {
            identity: Some("abcd1234".into()),
            name: Some("Annie".into()),
        };
        let (mut app, mut rx) = app_with(saved, "resume");
        app.handle_network_event(NetworkEvent::Connected);
        assert_eq!(
            rx.try_recv().unwrap(),
            InboundAction::Reconnect {
                identity: "abcd1234".into(),
                name: "Annie".into(),
            }
        );
    }

    #[test]
    fn welcome_is_persisted() {
        let (mut app, _rx) = app_with(SavedSession::default(), "welcome");
        app.handle_server_event(OutboundEvent::Welcome {
            identity: ParticipantId::from("feedbeef"),
            balance: 10_000,
            history: vec![3, 0],
            players: vec![summary("feedbeef", "Ann#feed", 10_000)],
        });
        assert_eq!(app.balance, 10_000);
        assert_eq!(app.my_display_name().as_deref(), Some("Ann#feed"));

        let saved = session::load(&app.session_path).unwrap();
        assert_eq!(saved.identity.as_deref(), Some("feedbeef"));
        assert_eq!(saved.name.as_deref(), Some("Ann"));
        std::fs::remove_file(&app.session_path).unwrap();
    }

    #[test]
    fn bet_form_sends_place_bet() {
        let (mut app, mut rx) = app_with(SavedSession::default(), "form");
        app.connected = true;
        app.quick_select(Category::Dozen, "second");
        app.adjust_stake(true);
        app.place_bet();
        assert_eq!(
            rx.try_recv().unwrap(),
            InboundAction::PlaceBet {
                category: "dozen".into(),
                selector: "second".into(),
                stake: 110,
            }
        );

        app.start_editing(Field::Stake);
        for c in "5x0".chars() {
            app.enter_char(c);
        }
        app.finish_input();
        assert_eq!(app.stake_input, "50");

        app.start_editing(Field::Selector);
        app.enter_char('x');
        app.cancel_input();
        assert_eq!(app.selector_input, "second");
    }

    #[test]
    fn new_betting_phase_clears_our_bets() {
        let (mut app, _rx) = app_with(SavedSession::default(), "phase");
        app.handle_server_event(OutboundEvent::BetAccepted {
            category: Category::Color,
            selector: "red".into(),
            stake: 100,
            balance: 900,
        });
        assert_eq!(app.total_staked(), 100);

        app.handle_server_event(OutboundEvent::GameState {
            phase: Phase::Settling,
            outcome: Some(5),
            countdown: None,
            history: vec![5],
        });
        assert_eq!(app.my_bets.len(), 1);
        assert_eq!(app.outcome, Some(5));

        app.handle_server_event(OutboundEvent::GameState {
            phase: Phase::Betting,
            outcome: None,
            countdown: Some(20),
            history: vec![5],
        });
        assert!(app.my_bets.is_empty());
        assert_eq!(app.outcome, None);
        assert_eq!(app.countdown, Some(20));
    }

    #[test]
    fn result_and_balance_updates() {
        let (mut app, _rx) = app_with(SavedSession::default(), "result");
        app.identity = Some(ParticipantId::from("me"));
        app.players.insert(ParticipantId::from("me"), summary("me", "Ann#me", 1_000));
        app.players.insert(ParticipantId::from("bob"), summary("bob", "Bob#bob", 1_000));

        app.handle_server_event(OutboundEvent::RoundResult {
            outcome: 7,
            payouts: vec![PayoutLine {
                category: Category::Straight,
                selector: "7".into(),
                stake: 10,
                winnings: 350,
            }],
            total_returned: 360,
            balance: 1_350,
        });
        assert_eq!(app.balance, 1_350);
        assert_eq!(app.last_result.as_ref().map(RoundSummary::net), Some(350));

        app.handle_server_event(OutboundEvent::PlayerBalanceUpdated {
            identity: ParticipantId::from("bob"),
            balance: 400,
        });
        assert_eq!(app.players[&ParticipantId::from("bob")].balance, 400);
        assert_eq!(app.balance, 1_350);

        app.handle_server_event(OutboundEvent::PlayerLeft {
            identity: ParticipantId::from("bob"),
        });
        assert!(!app.players[&ParticipantId::from("bob")].connected);
    }

    #[test]
    fn net_holds_amounts_beyond_i64() {
        let line = |stake| PayoutLine {
            category: Category::Color,
            selector: "red".into(),
            stake,
            winnings: 0,
        };
        let lost = RoundSummary {
            outcome: 2,
            payouts: vec![line(u64::MAX)],
            total_returned: 0,
        };
        assert_eq!(lost.net(), -i128::from(u64::MAX));

        let won = RoundSummary {
            outcome: 1,
            payouts: vec![line(1)],
            total_returned: u64::MAX,
        };
        assert_eq!(won.net(), i128::from(u64::MAX) - 1);
    }

    #[test]
    fn outcomes_are_described_with_color() {
        assert_eq!(describe_outcome(0), "0 green");
        assert_eq!(describe_outcome(1), "1 red");
        assert_eq!(describe_outcome(2), "2 black");
    }
}
