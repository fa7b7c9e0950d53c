use crate::export::{run_activity_export, run_status_export, ActivityExportArgs, StatusExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gazification::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Gazification Survey",
    about = "Serve the gas-network survey API or export survey data from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Write survey data to a CSV file
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Current gas status per address, one row per physical address
    Statuses(StatusExportArgs),
    /// Field worker sessions and their submission counts
    Activity(ActivityExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Survey seed JSON loaded into the in-memory repository
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Export {
            command: ExportCommand::Statuses(args),
        } => run_status_export(args),
        Command::Export {
            command: ExportCommand::Activity(args),
        } => run_activity_export(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_statuses_parses_filters() {
        let cli = Cli::try_parse_from([
            "gazification-api",
            "export",
            "statuses",
            "--mo-id",
            "3",
            "--district",
            "Центр",
            "--date-from",
            "2025-06-01",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Export {
                command: ExportCommand::Statuses(args),
            }) => {
                assert_eq!(args.mo_id, Some(3));
                assert_eq!(args.district.as_deref(), Some("Центр"));
                assert_eq!(args.date_from.as_deref(), Some("2025-06-01"));
                assert!(args.output.is_none());
            }
            other => panic!("expected status export, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["gazification-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
