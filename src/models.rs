pub mod chat;
pub mod config;
pub mod match_state;
pub mod role;
pub mod seat;
