mod commands;
mod config;
mod error;
mod output;
mod tag;

use std::path::PathBuf;

use batterytag_core::{BatteryCode, NoteKind};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::commands::AppContext;
use crate::config::{load_config, resolve_capacity, resolve_history_limit, resolve_log_path, resolve_tag_path};
use crate::output::LogFormat;
use crate::tag::{FileTag, TagModel};

#[derive(Parser)]
#[command(name = "btag")]
#[command(about = "Read and update FRC battery NFC tags", long_about = None)]
struct Cli {
    /// File holding the simulated tag's NDEF message
    #[arg(long, global = true)]
    tag: Option<PathBuf>,

    /// Tag capacity in bytes
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// Tag model preset, used when no capacity is given
    #[arg(long, global = true, value_enum)]
    model: Option<TagModel>,

    /// Treat the tag as read-only
    #[arg(long, global = true)]
    read_only: bool,

    /// Path to the tag log
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read and show the battery record on the tag
    Read,

    /// Write a fresh record to the tag
    Init {
        /// Hand-typed serial (1 to 8 ASCII characters)
        #[arg(long, conflicts_with_all = ["team", "new", "old", "special"])]
        serial: Option<String>,

        /// Team number for a BEST serial (defaults to team_number from the config)
        #[arg(long)]
        team: Option<String>,

        /// New battery id, 0 to 899
        #[arg(long, conflicts_with_all = ["old", "special"])]
        new: Option<u16>,

        /// Old battery id, 0 to 98
        #[arg(long, conflicts_with = "special")]
        old: Option<u16>,

        /// The reserved 999 battery code
        #[arg(long)]
        special: bool,
    },

    /// Log a robot run
    Robot,

    /// Log a completed charge and bump the cycle count
    Charged {
        /// Log the charge even if the last entry is already a charge
        #[arg(long)]
        force: bool,
    },

    /// Set the battery note
    Note {
        /// normal, practice, scrap or other
        kind: NoteKind,
    },

    /// Fit a JSON record file to the tag capacity and print the encoded text
    Encode {
        input: PathBuf,

        /// Also write the NDEF message to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Decode a record file
    Decode {
        input: PathBuf,

        /// The file holds an NDEF message instead of JSON text
        #[arg(long)]
        ndef: bool,
    },

    /// Write a printable HTML report of the tag
    Report {
        /// Output file (defaults to <serial>.report.html)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export the tag as pretty-printed JSON
    Export {
        /// Output file (defaults to <serial>.BEST.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a JSON record file to the tag
    Import { input: PathBuf },

    /// Show raw tag traffic, newest first
    Logs {
        /// Delete all log entries
        #[arg(long, conflicts_with = "export")]
        clear: bool,

        /// Write the log to this file instead of printing it
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format
        #[arg(long, value_enum, default_value_t = LogFormat::Json)]
        format: LogFormat,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config();
    let capacity = resolve_capacity(cli.capacity, cli.model, &config);
    let history_limit = resolve_history_limit(&config)?;

    let open_context = || {
        let mut tag = FileTag::new(resolve_tag_path(cli.tag.clone(), &config), capacity);
        if cli.read_only {
            tag = tag.read_only();
        }
        AppContext::open(tag, &resolve_log_path(cli.log_path.clone(), &config), history_limit)
    };

    match cli.command {
        Command::Read => commands::read(&mut open_context()?).await?,
        Command::Init {
            ref serial,
            ref team,
            new,
            old,
            special,
        } => {
            let code = match (new, old, special) {
                (Some(id), _, _) => Some(BatteryCode::New(id)),
                (_, Some(id), _) => Some(BatteryCode::Old(id)),
                (_, _, true) => Some(BatteryCode::Special),
                _ => None,
            };
            let serial = commands::build_serial(serial.clone(), team.clone(), code, &config)?;
            commands::init(&mut open_context()?, serial).await?;
        }
        Command::Robot => commands::robot(&mut open_context()?).await?,
        Command::Charged { force } => commands::charged(&mut open_context()?, force).await?,
        Command::Note { kind } => commands::note(&mut open_context()?, kind).await?,
        Command::Encode { ref input, ref out } => {
            commands::encode(input, capacity, history_limit, out.clone()).await?
        }
        Command::Decode { ref input, ndef } => commands::decode(input, ndef).await?,
        Command::Report { ref out } => commands::report(&mut open_context()?, out.clone()).await?,
        Command::Export { ref out } => commands::export(&mut open_context()?, out.clone()).await?,
        Command::Import { ref input } => commands::import(&mut open_context()?, input).await?,
        Command::Logs {
            clear,
            ref export,
            format,
        } => match export {
            Some(out) => commands::export_logs(&open_context()?, out, format).await?,
            None => commands::logs(&open_context()?, clear)?,
        },
    }

    Ok(())
}
