//! `parcel-tracker`: command-line front end for the parcel store.
//!
//! # Responsibility
//! - Map subcommands onto `parcel_core` service and repository calls.
//! - Configure file logging from flags or environment.
//! - Keep output deterministic: plain text by default, JSON with `--json`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use parcel_core::{
    default_log_level, init_logging, now_timestamp, open_db, ClientId, NewParcel, ParcelNumber,
    ParcelRepository, ParcelService, ParcelStatus, SqliteParcelStore,
};
use std::path::PathBuf;
use std::process::ExitCode;

mod output;

use output::{ConsoleEvents, Output};

/// Track parcels stored in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "parcel-tracker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "PARCEL_DB", default_value = "tracker.db", global = true)]
    db: PathBuf,

    /// Directory for rolling log files
    #[arg(long, env = "PARCEL_LOG_DIR", default_value = "logs", global = true)]
    log_dir: PathBuf,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "PARCEL_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new parcel (status `registered`, created now)
    Register { client: ClientId, address: String },

    /// Add a parcel with an explicit status
    Add {
        client: ClientId,
        status: String,
        address: String,

        /// Creation timestamp (RFC 3339); defaults to now
        #[arg(long)]
        created_at: Option<String>,
    },

    /// Show one parcel
    Get { number: ParcelNumber },

    /// List parcels of a client
    Client { client: ClientId },

    /// Overwrite the status of a parcel
    SetStatus { number: ParcelNumber, status: String },

    /// Advance a parcel along registered -> sent -> delivered
    NextStatus { number: ParcelNumber },

    /// Change the address of a registered parcel
    SetAddress { number: ParcelNumber, address: String },

    /// Delete a registered parcel
    Delete { number: ParcelNumber },

    /// Remove every parcel and restart numbering
    Clear,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, &cli.log_dir).context("failed to initialize logging")?;

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let events = ConsoleEvents {
        print_notices: !cli.json,
    };
    let store = SqliteParcelStore::with_events(&conn, events)
        .with_context(|| format!("`{}` is not a parcel database", cli.db.display()))?;
    let service = ParcelService::new(store);
    let out = Output::new(cli.json);

    info!(
        "event=cli_command module=cli status=start command={:?}",
        cli.command
    );

    match cli.command {
        Command::Register { client, address } => {
            let parcel = service.register(client, address)?;
            out.parcel(&parcel)
        }
        Command::Add {
            client,
            status,
            address,
            created_at,
        } => {
            let input = NewParcel::new(
                client,
                ParcelStatus::from(status),
                address,
                created_at.unwrap_or_else(now_timestamp),
            );
            let number = service.repository().add(&input)?;
            out.parcel(&input.into_parcel(number))
        }
        Command::Get { number } => out.parcel(&service.parcel(number)?),
        Command::Client { client } => out.parcels(&service.client_parcels(client)?),
        Command::SetStatus { number, status } => {
            let status = ParcelStatus::from(status);
            service.repository().set_status(number, &status)?;
            out.status(number, Some(&status))
        }
        Command::NextStatus { number } => {
            let next = service.next_status(number)?;
            out.status(number, next.as_ref())
        }
        Command::SetAddress { number, address } => {
            let outcome = service.change_address(number, &address)?;
            out.outcome(number, &outcome)
        }
        Command::Delete { number } => {
            let outcome = service.delete(number)?;
            out.outcome(number, &outcome)
        }
        Command::Clear => {
            service.repository().clear()?;
            out.cleared()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, Command};
    use clap::Parser;
    use parcel_core::{open_db, ParcelRepository, ParcelStatus, SqliteParcelStore};
    use std::path::Path;

    fn cli(db: &Path, log_dir: &Path, args: &[&str]) -> Cli {
        let db = db.to_str().unwrap();
        let log_dir = log_dir.to_str().unwrap();
        let mut argv = vec!["parcel-tracker", "--db", db, "--log-dir", log_dir];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_get_subcommand() {
        let parsed = Cli::try_parse_from(["parcel-tracker", "get", "7"]).unwrap();
        assert!(matches!(parsed.command, Command::Get { number: 7 }));
        assert!(!parsed.json);
    }

    #[test]
    fn rejects_non_numeric_parcel_number() {
        assert!(Cli::try_parse_from(["parcel-tracker", "get", "seven"]).is_err());
    }

    #[test]
    fn commands_run_against_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tracker.db");
        let logs = dir.path().join("logs");

        run(cli(&db, &logs, &["register", "1000", "test"])).unwrap();
        run(cli(&db, &logs, &["set-address", "1", "new"])).unwrap();
        run(cli(&db, &logs, &["--json", "next-status", "1"])).unwrap();
        run(cli(&db, &logs, &["delete", "1"])).unwrap();
        run(cli(&db, &logs, &["add", "1000", "registered", "second"])).unwrap();
        run(cli(&db, &logs, &["client", "1000"])).unwrap();
        assert!(run(cli(&db, &logs, &["get", "99"])).is_err());

        {
            let conn = open_db(&db).unwrap();
            let store = SqliteParcelStore::try_new(&conn).unwrap();
            let parcel = store.get(1).unwrap();
            assert_eq!(parcel.address, "new");
            assert_eq!(parcel.status, ParcelStatus::Sent);
            assert_eq!(store.get(2).unwrap().address, "second");
        }

        run(cli(&db, &logs, &["clear"])).unwrap();
        let conn = open_db(&db).unwrap();
        let store = SqliteParcelStore::try_new(&conn).unwrap();
        assert!(store.get_by_client(1000).unwrap().is_empty());
        assert!(logs.read_dir().unwrap().next().is_some());
    }
}
