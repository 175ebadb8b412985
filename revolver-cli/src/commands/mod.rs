pub mod account;
pub mod duel;

pub use account::{deposit, show_balance, show_history, show_leaderboard, transfer};
pub use duel::play_duel;
