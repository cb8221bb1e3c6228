//! Chat webhook delivery for structure maintenance digests.
//!
//! `structure-notify` posts a digest to an incoming webhook as
//! `{"text": "...", "channel": "..."}`, or prints it when running dry.
//!
//! # Example
//!
//! ```rust,no_run
//! use structure_notify::{Notification, NotificationChannel, WebhookChannel, WebhookConfig};
//!
//! # async fn run() -> structure_notify::Result<()> {
//! let config = WebhookConfig::new("slack", "https://hooks.slack.com/services/T0/B0/x")?
//!     .with_channel("#structures");
//! let channel = WebhookChannel::new(config)?;
//!
//! let notification = Notification::new(vec![
//!     "Upcoming Test Corp Structure Maintenance Tasks".to_string(),
//!     "Jita - Keepstar\nNo core installed".to_string(),
//! ]);
//! channel.send(&notification).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod error;

pub use channels::{
    LogChannel, Notification, NotificationChannel, NotificationResult, WebhookChannel,
    WebhookConfig, WebhookPayload,
};
pub use error::{NotifyError, Result};
