//! Focus tracker CLI library.
//!
//! This crate provides the CLI interface, configuration, the observation
//! sources and the sampling loop that drives the tracker.

mod cli;
pub mod commands;
mod config;
pub mod probe;
pub mod sampler;

pub use cli::{Cli, Commands};
pub use config::Config;
