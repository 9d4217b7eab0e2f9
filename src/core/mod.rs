//! Core infrastructure shared by every subcommand

pub mod config;
pub mod error;
pub mod output;
pub mod version;
