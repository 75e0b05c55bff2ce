//! Domain types - core business entities
//!
//! Parsed records, their wire representation, and the process configuration.

pub mod config;
pub mod record;
