//! `audit`: fuel and fitting details for every structure.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use structure_esi::{EsiApi, SnapshotLoader};

use crate::config::Config;
use crate::error::BotError;
use crate::output::{AuditReport, AuditRow, OutputFormat};

/// Audit command executor.
pub struct AuditCommand<'a, C> {
    config: &'a Config,
    client: Arc<C>,
}

impl<'a, C: EsiApi> AuditCommand<'a, C> {
    /// Create a new audit command.
    #[must_use]
    pub const fn new(config: &'a Config, client: Arc<C>) -> Self {
        Self { config, client }
    }

    /// Loads the corporation and collects one row per structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the corporation cannot be loaded.
    pub async fn report(&self, now: DateTime<Utc>) -> Result<AuditReport, BotError> {
        let snapshot = SnapshotLoader::new(Arc::clone(&self.client), self.config.esi.concurrency)
            .with_starbases(false)
            .load(&self.config.corporation)
            .await?;

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        if let Some(reason) = snapshot.assets_error() {
            errors.push(format!("Assets unavailable, fittings are empty: {reason}"));
        }
        for (structure_id, structure) in snapshot.structures(&self.config.fuel_bonus) {
            match structure {
                Ok(s) => {
                    let row = AuditRow::from_structure(&s, now, self.config.thresholds.too_soon);
                    if let Some(err) = &row.fuel_rate_error {
                        warn!(structure_id, error = %err, "fuel rate unavailable");
                        errors.push(format!("Structure {structure_id}: {err}"));
                    }
                    rows.push(row);
                }
                Err(err) => {
                    warn!(structure_id, error = %err, "failed to audit structure");
                    errors.push(format!("Structure {structure_id}: {err}"));
                }
            }
        }
        Ok(AuditReport::new(self.config.corporation.clone(), rows, errors))
    }

    /// Execute the audit command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or output fails.
    pub async fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), BotError> {
        let report = self.report(Utc::now()).await?;
        format.write(writer, &report)
    }
}
