//! Runtime configuration assembled from flags and environment.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::debug;

use structure_core::{AlertThresholds, FuelBonusTable, TowerFuelTable};
use structure_esi::{Datasource, EsiConfig, NeucoreConfig};
use structure_notify::WebhookConfig;

use crate::cli::{Cli, Commands, ThresholdArgs};
use crate::error::BotError;

/// Everything a command needs, validated.
#[derive(Debug, Clone)]
pub struct Config {
    /// Corporation to check.
    pub corporation: String,
    /// ESI client settings, with Neucore credentials.
    pub esi: EsiConfig,
    /// Alert thresholds.
    pub thresholds: AlertThresholds,
    /// Service module fuel discounts.
    pub fuel_bonus: Arc<FuelBonusTable>,
    /// Control tower consumption rates.
    pub tower_fuel: TowerFuelTable,
    /// Digest destination; absent only for dry runs and audits.
    pub webhook: Option<WebhookConfig>,
    /// Skip starbase checks.
    pub ignore_pos: bool,
    /// Propagate fetch failures instead of posting them.
    pub debug: bool,
}

impl Config {
    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` naming the first missing or invalid setting.
    pub fn from_args(cli: &Cli) -> Result<Self, BotError> {
        let corporation = required(cli.corporation.as_deref(), "CORPORATION_NAME")?.to_string();

        let datasource: Datasource = required(cli.esi.datasource.as_deref(), "NEUCORE_DATASOURCE")?.parse()?;
        let neucore = NeucoreConfig::new(
            required(cli.esi.neucore_host.as_deref(), "NEUCORE_HOST")?,
            required(cli.esi.app_id.as_deref(), "NEUCORE_APP_ID")?,
            required(cli.esi.app_secret.as_deref(), "NEUCORE_APP_SECRET")?,
            datasource,
        )?;
        if cli.esi.timeout_secs == 0 {
            return Err(BotError::Config("ESI_TIMEOUT must be greater than 0".to_string()));
        }
        let esi = EsiConfig::new(&cli.esi.esi_host)?
            .with_neucore(neucore)
            .with_user_agent(cli.esi.user_agent.clone())
            .with_timeout(Duration::from_secs(cli.esi.timeout_secs))
            .with_concurrency(cli.esi.concurrency);

        let fuel_bonus = match &cli.fuel_bonus_table {
            Some(path) => FuelBonusTable::from_path(path)?,
            None => FuelBonusTable::default(),
        };
        let tower_fuel = match &cli.tower_fuel_table {
            Some(path) => TowerFuelTable::from_path(path)?,
            None => TowerFuelTable::default(),
        };

        let webhook = match cli.webhook.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let mut webhook = WebhookConfig::new("webhook", url)?
                    .with_user_agent(cli.esi.user_agent.clone())
                    .with_timeout_secs(cli.esi.timeout_secs);
                if let Some(channel) = &cli.channel {
                    webhook = webhook.with_channel(channel.clone());
                }
                Some(webhook)
            }
            None => None,
        };
        let posts_digest = match cli.command() {
            Commands::Check(args) => !args.dry_run,
            Commands::Audit => false,
        };
        if posts_digest && webhook.is_none() {
            return Err(BotError::Config(
                "OUTBOUND_WEBHOOK is required unless --dry-run is given".to_string(),
            ));
        }

        let config = Self {
            corporation,
            esi,
            thresholds: thresholds(&cli.thresholds)?,
            fuel_bonus: Arc::new(fuel_bonus),
            tower_fuel,
            webhook,
            ignore_pos: cli.ignore_pos,
            debug: cli.debug,
        };
        debug!(
            corporation = %config.corporation,
            esi_host = %config.esi.esi_host,
            ignore_pos = config.ignore_pos,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, BotError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BotError::Config(format!("{name} is required")))
}

fn days(value: i64, name: &str) -> Result<TimeDelta, BotError> {
    TimeDelta::try_days(value).ok_or_else(|| BotError::Config(format!("{name} of {value} days is out of range")))
}

/// Converts threshold flags into [`AlertThresholds`].
///
/// # Errors
///
/// Returns `BotError::Config` for negative, zero or out of range windows.
pub fn thresholds(args: &ThresholdArgs) -> Result<AlertThresholds, BotError> {
    if args.too_soon <= 0 {
        return Err(BotError::Config("TOO_SOON must be at least 1 day".to_string()));
    }
    if args.detonation_warning <= 0 {
        return Err(BotError::Config("DETONATION_WARNING must be at least 1 day".to_string()));
    }
    if args.stront_hours <= 0 {
        return Err(BotError::Config("STRONT_HOURS must be at least 1 hour".to_string()));
    }
    if args.jumpgate_fuel_warn < 0 {
        return Err(BotError::Config("JUMPGATE_FUEL_WARN cannot be negative".to_string()));
    }
    Ok(AlertThresholds::default()
        .with_too_soon(days(args.too_soon, "TOO_SOON")?)
        .with_detonation_warning(days(args.detonation_warning, "DETONATION_WARNING")?)
        .with_stront_hours(args.stront_hours)
        .with_jumpgate_fuel_warn(args.jumpgate_fuel_warn))
}
