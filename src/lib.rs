//! ditto: a teachable question/answer engine for chatbots
//!
//! This library provides:
//! - A teach command (`# question answer [options]`) to create, modify,
//!   search, review and revert dialogues
//! - A receiver that matches messages against stored dialogues and renders
//!   a weighted random answer
//! - Feature plugins: probabilities, guild contexts, writers and freezing,
//!   predecessor chains, active hours and rate limiting
//! - In-memory and SQLite dialogue stores
//! - A terminal driver for local use

pub mod channels;
pub mod config;
pub mod core;
pub mod engine;
pub mod plugins;
pub mod services;
pub mod storage;
pub mod teach;
pub mod transport;

pub use config::Config;
pub use engine::{Engine, EngineBuilder};
