//! structurebot binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use structure_esi::EsiClient;
use structurebot::cli::{Cli, Commands};
use structurebot::commands::{AuditCommand, CheckCommand};
use structurebot::output::OutputFormat;
use structurebot::{BotError, Config, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.debug, cli.log_format) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BotError> {
    let config = Config::from_args(&cli)?;
    let client = Arc::new(EsiClient::new(config.esi.clone())?);
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command() {
        Commands::Check(args) => {
            let cmd = CheckCommand::new(&config, client);
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Audit => {
            let cmd = AuditCommand::new(&config, client);
            cmd.execute(&mut stdout, &format).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use structurebot::cli::{Format, LogFormat};

    #[test]
    fn cli_parses_check() {
        let cli = Cli::parse_from(["structurebot", "check", "--dry-run", "--suppress-fuel-warning"]);
        match cli.command() {
            Commands::Check(args) => {
                assert!(args.dry_run);
                assert!(args.suppress_fuel_warning);
                assert!(!args.suppress_core_state);
            }
            Commands::Audit => panic!("expected check command"),
        }
    }

    #[test]
    fn cli_parses_audit() {
        let cli = Cli::parse_from(["structurebot", "audit"]);
        assert!(matches!(cli.command(), Commands::Audit));
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["structurebot", "--format", "json", "audit"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn cli_respects_log_format_flag() {
        let cli = Cli::parse_from(["structurebot", "--log-format", "json", "audit"]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn cli_respects_threshold_flags() {
        let cli = Cli::parse_from(["structurebot", "--too-soon", "7", "--jumpgate-fuel-warn", "100000", "check"]);
        assert_eq!(cli.thresholds.too_soon, 7);
        assert_eq!(cli.thresholds.jumpgate_fuel_warn, 100_000);
    }

    #[test]
    fn cli_parses_boolish_flags() {
        let cli = Cli::parse_from(["structurebot", "--debug", "--ignore-pos"]);
        assert!(cli.debug);
        assert!(cli.ignore_pos);
    }

    #[tokio::test]
    async fn run_without_corporation_fails() {
        let mut cli = Cli::parse_from(["structurebot", "audit"]);
        cli.corporation = None;
        let result = run(cli).await;
        assert!(matches!(result, Err(BotError::Config(_))));
    }
}
