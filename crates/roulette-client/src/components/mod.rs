// crates/roulette-client/src/components/mod.rs

pub mod activity_log;
pub mod bet_entry;
pub mod help;
pub mod player_list;
pub mod status_bar;
pub mod wheel;
