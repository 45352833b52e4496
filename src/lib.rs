//! poly-revert: Mean-reversion trading bot for Polymarket 15-minute crypto markets
//!
//! This library provides the core components for:
//! - Real-time price feeds from Binance
//! - Per-asset rolling price windows with Z-score statistics
//! - Signal generation from Z-score threshold crossings
//! - Position tracking with cooldowns, forced closes, and loss-streak halts
//! - Paper/live order gateway abstraction
//! - Market window metadata for short-lived binary markets
//! - Full observability stack

pub mod cli;
pub mod config;
pub mod engine;
pub mod feed;
pub mod gateway;
pub mod market;
pub mod position;
pub mod signal;
pub mod telemetry;
pub mod window;
