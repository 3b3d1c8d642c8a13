pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod parser;
pub mod search;
pub mod state;
pub mod utils;
