//! # Racestage Library
//!
//! This library exposes the Racestage modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod chart;
pub mod cli;
pub mod config;
pub mod provider;

// Re-export racestage_core for convenience
pub use racestage_core;
