//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use structure_core::ReportOptions;
use structure_esi::config::{DEFAULT_ESI_HOST, DEFAULT_USER_AGENT};

/// Structurebot - EVE Online structure maintenance alerts.
#[derive(Parser, Debug, Clone)]
#[command(name = "structurebot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// ESI and Neucore connection settings.
    #[command(flatten)]
    pub esi: EsiArgs,

    /// Alert thresholds.
    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Corporation whose structures are checked.
    #[arg(short, long, env = "CORPORATION_NAME")]
    pub corporation: Option<String>,

    /// Incoming webhook URL the digest is posted to.
    #[arg(short, long, env = "OUTBOUND_WEBHOOK")]
    pub webhook: Option<String>,

    /// Chat channel override sent with the digest.
    #[arg(long, env = "WEBHOOK_CHANNEL")]
    pub channel: Option<String>,

    /// Skip starbase checks.
    #[arg(long, env = "IGNORE_POS", value_parser = BoolishValueParser::new())]
    pub ignore_pos: bool,

    /// Verbose logging; fetch failures abort instead of being posted.
    #[arg(short, long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// JSON file with service module fuel discounts.
    #[arg(long, env = "FUEL_BONUS_TABLE")]
    pub fuel_bonus_table: Option<PathBuf>,

    /// JSON file with control tower fuel rates.
    #[arg(long, env = "TOWER_FUEL_TABLE")]
    pub tower_fuel_table: Option<PathBuf>,

    /// Subcommand to execute; defaults to `check`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand, with `check` filled in when none was given.
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Check(CheckArgs::default()))
    }
}

/// ESI and Neucore connection settings.
#[derive(Args, Debug, Clone)]
pub struct EsiArgs {
    /// Public ESI base URL.
    #[arg(long, env = "ESI_HOST", default_value = DEFAULT_ESI_HOST)]
    pub esi_host: String,

    /// Neucore ESI proxy endpoint.
    #[arg(long, env = "NEUCORE_HOST")]
    pub neucore_host: Option<String>,

    /// Neucore application id.
    #[arg(long, env = "NEUCORE_APP_ID")]
    pub app_id: Option<String>,

    /// Neucore application secret.
    #[arg(long, env = "NEUCORE_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Character used for authenticated requests, as `id[:login]`.
    #[arg(long, env = "NEUCORE_DATASOURCE")]
    pub datasource: Option<String>,

    /// User-Agent sent to ESI and the webhook.
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Maximum concurrent ESI requests.
    #[arg(long, env = "ESI_CONCURRENCY", default_value = "8")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "ESI_TIMEOUT", default_value = "30")]
    pub timeout_secs: u64,
}

/// Alert thresholds.
#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    /// Warn when fuel runs out within this many days.
    #[arg(long, env = "TOO_SOON", default_value = "3")]
    pub too_soon: i64,

    /// Warn when a starbase has fewer hours of strontium.
    #[arg(long, env = "STRONT_HOURS", default_value = "12")]
    pub stront_hours: i64,

    /// Warn when an extraction arrives within this many days.
    #[arg(long, env = "DETONATION_WARNING", default_value = "1")]
    pub detonation_warning: i64,

    /// Warn when a jump gate holds less Liquid Ozone.
    #[arg(long, env = "JUMPGATE_FUEL_WARN", default_value = "500000")]
    pub jumpgate_fuel_warn: i64,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check structures and post the maintenance digest.
    Check(CheckArgs),

    /// Print fuel and fitting details for every structure.
    Audit,
}

/// Arguments for `check`.
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Omit extractions arriving soon.
    #[arg(long)]
    pub suppress_upcoming_detonations: bool,

    /// Omit moon drills with nothing scheduled.
    #[arg(long)]
    pub suppress_unscheduled_detonations: bool,

    /// Omit jump gates low on Liquid Ozone.
    #[arg(long)]
    pub suppress_ansiblex_ozone: bool,

    /// Omit fuel warnings.
    #[arg(long)]
    pub suppress_fuel_warning: bool,

    /// Omit service listings.
    #[arg(long)]
    pub suppress_service_state: bool,

    /// Omit reinforcement timers.
    #[arg(long)]
    pub suppress_structure_state: bool,

    /// Omit missing quantum cores.
    #[arg(long)]
    pub suppress_core_state: bool,

    /// Print the digest instead of posting it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CheckArgs {
    /// Report toggles with suppressed categories switched off.
    #[must_use]
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            upcoming_detonations: !self.suppress_upcoming_detonations,
            unscheduled_detonations: !self.suppress_unscheduled_detonations,
            ansiblex_ozone: !self.suppress_ansiblex_ozone,
            fuel_warning: !self.suppress_fuel_warning,
            service_state: !self.suppress_service_state,
            structure_state: !self.suppress_structure_state,
            core_state: !self.suppress_core_state,
            ..ReportOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_options_enable_everything() {
        assert_eq!(CheckArgs::default().report_options(), ReportOptions::default());
    }

    #[test]
    fn suppress_flags_map_to_options() {
        let args = CheckArgs {
            suppress_fuel_warning: true,
            suppress_core_state: true,
            ..CheckArgs::default()
        };
        let options = args.report_options();
        assert!(!options.fuel_warning);
        assert!(!options.core_state);
        assert!(options.service_state);
        assert!(options.assets_available);
    }

    #[test]
    fn missing_subcommand_means_check() {
        let cli = Cli::parse_from(["structurebot"]);
        assert!(matches!(cli.command(), Commands::Check(args) if !args.dry_run));
    }

    #[test]
    fn threshold_defaults() {
        let cli = Cli::parse_from(["structurebot", "audit"]);
        assert_eq!(cli.thresholds.too_soon, 3);
        assert_eq!(cli.thresholds.stront_hours, 12);
        assert_eq!(cli.thresholds.detonation_warning, 1);
        assert_eq!(cli.thresholds.jumpgate_fuel_warn, 500_000);
        assert_eq!(cli.esi.concurrency, 8);
    }
}
