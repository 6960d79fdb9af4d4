//! Command-line interface components
//!
//! This module contains CLI-specific code for the fetching cache, including
//! argument parsing and command handlers.

pub mod args;
pub mod commands;

pub use args::{CacheAction, CacheArgs, Cli, Commands, DownloadArgs, GlobalArgs};
pub use commands::{handle_cache, handle_download};
