//! Typed calls to each backend, grouped by service. Every method hangs off
//! [`crate::Client`].

pub mod business;
pub mod chat;
pub mod family;
pub mod inbox;
pub mod jail;
pub mod kill;
pub mod leaderboard;
pub mod missions;
pub mod player;
pub mod upgrades;
