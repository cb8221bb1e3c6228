//! ESI access for structurebot.
//!
//! Authenticated corporation endpoints are routed through a Neucore ESI
//! proxy; universe data is read from public ESI. The [`SnapshotLoader`]
//! gathers everything `structure-core` needs for one corporation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use structure_esi::{EsiClient, EsiConfig, NeucoreConfig, SnapshotLoader};
//!
//! # async fn example() -> structure_esi::Result<()> {
//! let neucore = NeucoreConfig::new(
//!     "https://neucore.example.com/api/app/v2/esi",
//!     "7",
//!     "secret",
//!     "96061222".parse()?,
//! )?;
//! let client = EsiClient::new(EsiConfig::new("https://esi.evetech.net")?.with_neucore(neucore))?;
//! let snapshot = SnapshotLoader::new(Arc::new(client), 8).load("Test Corp").await?;
//! println!("{} structures", snapshot.structures.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod snapshot;

pub use api::{EsiApi, FakeEsi};
pub use catalog::{CatalogLoader, build_item_type};
pub use client::{EsiClient, Route};
pub use config::{Datasource, EsiConfig, NeucoreConfig, RetryConfig};
pub use error::{EsiError, Result};
pub use names::NameResolver;
pub use snapshot::{CorporationSnapshot, SnapshotLoader};
