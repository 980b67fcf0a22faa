//! Auction sniper: spots underpriced BIN listings on the SkyBlock auction house.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feed;
pub mod engine;
pub mod strategy;
pub mod storage;
