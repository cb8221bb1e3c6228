//! # structurebot
//!
//! Checks a corporation's Upwell structures and control towers and posts
//! a maintenance digest to a chat webhook.
//!
//! Provides commands for:
//! - `check`: fuel, core, extraction, ozone and timer alerts, posted as one digest
//! - `audit`: fuel rate and fitting of every structure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  Neucore / ESI  ┌───────────────┐  snapshot  ┌────────────────┐
//! │ structurebot│────────────────►│ structure-esi │───────────►│ structure-core │
//! └─────────────┘                 └───────────────┘            └────────────────┘
//!        │                                                              │
//!        │              digest                ┌──────────────────┐      │
//!        └───────────────────────────────────►│ structure-notify │◄─────┘
//!                                             └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::{CheckArgs, Cli, Commands, Format, LogFormat};
pub use config::Config;
pub use error::BotError;
pub use output::OutputFormat;
