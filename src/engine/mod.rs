//! Core engine: key normalization, the price baseline, dedup, and the
//! minute-aligned poll loop that ties them together.

pub mod normalizer;
pub mod baseline;
pub mod dedup;
pub mod orchestrator;
