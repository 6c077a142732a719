//! Operator tool for the MAT bot's Telegram webhook: resolves the callback URL
//! and shared secret, registers them with the Bot API and reads the state back.

pub mod cli;
pub mod config;
pub mod prompt;
pub mod redact;
pub mod telegram;
pub mod tunnel;
pub mod version;
pub mod webhook;

#[cfg(test)]
mod testing;
