//! Integration tests for the auction sniper.

mod cycle;
mod mock_feed;
