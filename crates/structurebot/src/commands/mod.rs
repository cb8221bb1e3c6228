//! Command implementations.

pub mod audit;
pub mod check;

pub use audit::AuditCommand;
pub use check::{CheckCommand, build_digest, deliver};
