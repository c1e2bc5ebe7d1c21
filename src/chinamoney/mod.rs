// src/chinamoney/mod.rs
pub mod client;
pub mod models;
