//! `check`: load the corporation, evaluate every alert and post the digest.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use structure_core::{Digest, ReportOptions, check_starbase, evaluate};
use structure_esi::{CorporationSnapshot, EsiApi, SnapshotLoader};
use structure_notify::{LogChannel, Notification, NotificationChannel, WebhookChannel};

use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::BotError;
use crate::output::{CheckOutcome, OutputFormat};

/// Builds the digest for a loaded snapshot.
///
/// Missing assets add the warning banner and switch off ozone and core
/// lines. A structure that cannot be assembled becomes an error line
/// rather than failing the run. A missing fuel attribute adds an error
/// line next to the structure's alerts.
#[must_use]
pub fn build_digest(
    snapshot: &CorporationSnapshot,
    now: DateTime<Utc>,
    config: &Config,
    options: ReportOptions,
) -> Digest {
    let mut digest = Digest::new(snapshot.corporation_name.clone());
    let mut options = options;
    if let Some(reason) = snapshot.assets_error() {
        digest.push_assets_unavailable(reason);
        options = options.without_assets();
    }

    for (structure_id, structure) in snapshot.structures(&config.fuel_bonus) {
        match structure.map(|s| evaluate(&s, now, &config.thresholds)) {
            Ok(report) => {
                if let Some(err) = report.fuel_rate_error() {
                    warn!(structure_id, error = %err, "fuel rate unavailable");
                    digest.push_error(format!("Structure {structure_id}: {err}"));
                }
                digest.push_report(&report, &options);
            }
            Err(err) => {
                warn!(structure_id, error = %err, "failed to assemble structure");
                digest.push_error(format!("Structure {structure_id}: {err}"));
            }
        }
    }

    if !config.ignore_pos {
        for starbase in &snapshot.starbases {
            let in_sovereignty = snapshot.in_sovereignty(starbase.system_id);
            for message in check_starbase(starbase, in_sovereignty, &config.thresholds, &config.tower_fuel) {
                digest.push_message(message);
            }
        }
    }
    digest
}

/// Hands the digest to a channel, returning the channel name.
///
/// # Errors
///
/// Returns an error if the channel rejects the notification.
pub async fn deliver<N: NotificationChannel>(channel: &N, digest: &Digest) -> Result<String, BotError> {
    let result = channel.send(&Notification::new(digest.lines())).await?;
    Ok(result.channel)
}

/// Check command executor.
pub struct CheckCommand<'a, C> {
    config: &'a Config,
    client: Arc<C>,
}

impl<'a, C: EsiApi> CheckCommand<'a, C> {
    /// Create a new check command.
    #[must_use]
    pub const fn new(config: &'a Config, client: Arc<C>) -> Self {
        Self { config, client }
    }

    /// Loads the corporation and builds its digest.
    ///
    /// A load failure becomes the digest's only message, unless debug is
    /// on, in which case it is returned.
    ///
    /// # Errors
    ///
    /// Returns the load error when debug is on.
    pub async fn digest(&self, args: &CheckArgs, now: DateTime<Utc>) -> Result<Digest, BotError> {
        let loader = SnapshotLoader::new(Arc::clone(&self.client), self.config.esi.concurrency)
            .with_starbases(!self.config.ignore_pos);
        match loader.load(&self.config.corporation).await {
            Ok(snapshot) => Ok(build_digest(&snapshot, now, self.config, args.report_options())),
            Err(err) if self.config.debug => Err(err.into()),
            Err(err) => {
                error!(corporation = %self.config.corporation, error = %err, "failed to load corporation");
                let mut digest = Digest::new(self.config.corporation.clone());
                digest.push_message(err.to_string());
                Ok(digest)
            }
        }
    }

    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery or output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &CheckArgs,
    ) -> Result<(), BotError> {
        let digest = self.digest(args, Utc::now()).await?;

        let delivered_to = if digest.is_empty() {
            info!(corporation = %self.config.corporation, "nothing to report");
            None
        } else if args.dry_run {
            Some(deliver(&LogChannel::default(), &digest).await?)
        } else {
            let webhook = self.config.webhook.clone().ok_or_else(|| {
                BotError::Config("OUTBOUND_WEBHOOK is required unless --dry-run is given".to_string())
            })?;
            Some(deliver(&WebhookChannel::new(webhook)?, &digest).await?)
        };

        let outcome = CheckOutcome {
            corporation: self.config.corporation.clone(),
            messages: digest.messages().len(),
            errors: digest.errors().len(),
            delivered_to,
            lines: if digest.is_empty() { Vec::new() } else { digest.lines() },
        };
        format.write(writer, &outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use crate::commands::fixtures::{self, ALLIANCE};
    use chrono::TimeZone;
    use structure_core::StructureState;
    use structure_core::report::ASSETS_UNAVAILABLE_BANNER;
    use structure_esi::FakeEsi;
    use structure_esi::models::SovereigntyEntry;

    async fn digest_for(fake: FakeEsi, config: &Config, args: &CheckArgs) -> Result<Digest, BotError> {
        CheckCommand::new(config, Arc::new(fake)).digest(args, fixtures::now()).await
    }

    mod digest_tests {
        use super::*;

        #[tokio::test]
        async fn full_digest() {
            let config = fixtures::config();
            let digest = digest_for(fixtures::fake(true), &config, &CheckArgs::default()).await.unwrap();

            assert!(digest.errors().is_empty());
            assert_eq!(
                digest.lines(),
                vec![
                    "Upcoming Test Corp Structure Maintenance Tasks".to_string(),
                    "Amarr VIII - Moon 1 has 0.1 days of fuel".to_string(),
                    format!("Found an inaccessible citadel ({}) in Jita", fixtures::HIDDEN),
                    "Jita - Factory\nNo core installed".to_string(),
                ]
            );
        }

        #[tokio::test]
        async fn suppressed_core_state() {
            let config = fixtures::config();
            let args = CheckArgs {
                suppress_core_state: true,
                ..CheckArgs::default()
            };
            let digest = digest_for(fixtures::fake(true), &config, &args).await.unwrap();
            assert!(!digest.text().contains("No core installed"));
        }

        #[tokio::test]
        async fn ignore_pos_skips_starbases() {
            let mut config = fixtures::config();
            config.ignore_pos = true;
            let fake = Arc::new(fixtures::fake(true));
            let digest = CheckCommand::new(&config, Arc::clone(&fake))
                .digest(&CheckArgs::default(), fixtures::now())
                .await
                .unwrap();

            assert!(!digest.text().contains("Moon 1"));
            assert_eq!(fake.calls("corporation_starbases"), 0);
        }

        #[tokio::test]
        async fn asset_failure_adds_banner() {
            let config = fixtures::config();
            let digest = digest_for(fixtures::fake(false), &config, &CheckArgs::default()).await.unwrap();

            assert_eq!(digest.errors().len(), 4);
            assert!(digest.errors()[0].contains("503"));
            assert_eq!(digest.errors()[1..], ASSETS_UNAVAILABLE_BANNER.map(String::from));
            assert!(!digest.text().contains("No core installed"));
            assert!(digest.lines()[4].starts_with("Upcoming Test Corp"));
        }

        #[tokio::test]
        async fn outside_sovereignty_burns_full_rate() {
            let config = fixtures::config();
            let mut fake = fixtures::fake(true);
            fake.sovereignty = vec![SovereigntyEntry {
                system_id: fixtures::AMARR,
                alliance_id: Some(ALLIANCE + 1),
                corporation_id: None,
                faction_id: None,
            }];
            let digest = digest_for(fake, &config, &CheckArgs::default()).await.unwrap();
            // 100 blocks at 40/h
            assert!(digest.text().contains("Amarr VIII - Moon 1 has 0.1 days of fuel"));
        }

        #[tokio::test]
        async fn load_failure_becomes_message() {
            let mut config = fixtures::config();
            config.corporation = "Nobody".to_string();
            let digest = digest_for(fixtures::fake(true), &config, &CheckArgs::default()).await.unwrap();

            assert_eq!(digest.messages().len(), 1);
            assert!(digest.messages()[0].contains("Nobody"));
            assert_eq!(digest.header(), "Upcoming Nobody Structure Maintenance Tasks");
        }

        #[tokio::test]
        async fn load_failure_propagates_in_debug() {
            let mut config = fixtures::config();
            config.corporation = "Nobody".to_string();
            config.debug = true;
            let err = digest_for(fixtures::fake(true), &config, &CheckArgs::default()).await.unwrap_err();
            assert!(matches!(err, BotError::Esi(_)));
        }

        #[tokio::test]
        async fn module_without_fuel_attribute_keeps_alerts() {
            let config = fixtures::config();
            let mut fake = fixtures::fake(true);
            if let Some(plant) = fake.types.get_mut(&fixtures::PLANT) {
                plant.dogma_attributes.clear();
            }
            if let Some(records) = fake.structures.get_mut(&fixtures::CORP) {
                records[0].state = StructureState::HullReinforce;
                records[0].state_timer_end = Some(Utc.with_ymd_and_hms(2024, 5, 2, 18, 0, 0).unwrap());
            }
            let digest = digest_for(fake, &config, &CheckArgs::default()).await.unwrap();

            assert_eq!(
                digest.errors(),
                [format!(
                    "Structure {}: service module Standup Manufacturing Plant I ({}) has no fuel consumption attribute",
                    fixtures::RAITARU,
                    fixtures::PLANT
                )]
            );
            assert!(digest.text().contains("Jita - Factory\nHull Reinforce until 2024-05-02 18:00 UTC\nNo core installed"));
            assert!(digest.text().contains("inaccessible citadel"));
        }
    }

    mod execute_tests {
        use super::*;

        #[tokio::test]
        async fn dry_run_reports_log_channel() {
            let config = fixtures::config();
            let cmd = CheckCommand::new(&config, Arc::new(fixtures::fake(true)));
            let args = CheckArgs {
                dry_run: true,
                ..CheckArgs::default()
            };
            let mut buf = Vec::new();
            cmd.execute(&mut buf, &OutputFormat::new(Format::Json), &args).await.unwrap();

            let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
            assert_eq!(value["corporation"], "Test Corp");
            assert_eq!(value["delivered_to"], "log");
            assert_eq!(value["messages"], 3);
            assert_eq!(value["lines"][0], "Upcoming Test Corp Structure Maintenance Tasks");
        }

        #[tokio::test]
        async fn missing_webhook_is_a_config_error() {
            let config = fixtures::config();
            let cmd = CheckCommand::new(&config, Arc::new(fixtures::fake(true)));
            let mut buf = Vec::new();
            let err = cmd
                .execute(&mut buf, &OutputFormat::default(), &CheckArgs::default())
                .await
                .unwrap_err();
            assert!(matches!(err, BotError::Config(_)));
            assert!(buf.is_empty());
        }

        #[tokio::test]
        async fn deliver_uses_channel_name() {
            let mut digest = Digest::new("Test Corp");
            digest.push_message("Jita - Factory\nNo core installed");
            let channel = LogChannel::new("stdout");
            assert_eq!(deliver(&channel, &digest).await.unwrap(), "stdout");
        }
    }
}
