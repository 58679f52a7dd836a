//! `hypernotes` command-line entry point.
//!
//! # Responsibility
//! - Expose list/table/add/remove over one JSON record store.
//! - Map core errors to a non-zero exit code with a one-line message.
//!
//! # Invariants
//! - File logging starts only when a log directory is configured.
//! - Store output goes to stdout, diagnostics to stderr.

use clap::{Parser, Subcommand};
use hypernotes_core::{
    default_log_level, format_timestamp, init_logging, FieldValue, JsonFileStore, LoadOptions,
    Record, RecordId, RecordStore,
};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Keep notes on machine-learning experiments in a JSON file.
#[derive(Parser, Debug)]
#[command(name = "hypernotes", version, about)]
struct Cli {
    /// JSON file holding the record collection.
    #[arg(value_name = "STORE_PATH")]
    store_path: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, env = "HYPERNOTES_LOG_LEVEL", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files; logging is off when unset.
    #[arg(long, env = "HYPERNOTES_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One line per record, most recent first.
    List,
    /// Flattened dotted-path table of all records.
    Table {
        /// Print rows as a JSON array instead of aligned text.
        #[arg(long)]
        json: bool,
        /// Keep file order instead of most recent first.
        #[arg(long)]
        oldest_first: bool,
    },
    /// Create a record here and add it to the store.
    Add {
        #[arg(long)]
        text: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Parameter as key=value; repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        params: Vec<(String, FieldValue)>,
        /// Metric as key=value; repeatable.
        #[arg(long = "metric", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        metrics: Vec<(String, FieldValue)>,
        /// Set the end time before storing.
        #[arg(long)]
        close: bool,
    },
    /// Remove records by identifier.
    Remove {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<RecordId>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(cli.log_level.as_deref(), cli.log_dir.as_deref()) {
        eprintln!("hypernotes: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("hypernotes: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(level: Option<&str>, log_dir: Option<&Path>) -> CliResult<()> {
    let Some(log_dir) = log_dir else {
        return Ok(());
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(log_dir)
    };
    init_logging(level.unwrap_or(default_log_level()), log_dir)?;
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let store = JsonFileStore::new(&cli.store_path);
    info!(
        "event=cli_command module=cli status=start store={}",
        store.path().display()
    );

    match cli.command {
        Command::List => list(&store),
        Command::Table { json, oldest_first } => table(&store, json, oldest_first),
        Command::Add {
            text,
            model,
            target,
            params,
            metrics,
            close,
        } => {
            let mut record = Record::new(text);
            record.set_model(model);
            record.set_target(target);
            record.parameters_mut().extend(params);
            record.metrics_mut().extend(metrics);
            if close {
                record.close();
            }
            store.add(&record)?;
            println!("{}", record.identifier());
            Ok(())
        }
        Command::Remove { ids } => {
            store.remove(&ids)?;
            println!("removed {}", ids.len());
            Ok(())
        }
    }
}

fn list(store: &JsonFileStore) -> CliResult<()> {
    for record in store.load(&LoadOptions::default())? {
        println!(
            "{}  {}  {}  {}",
            record.identifier(),
            format_timestamp(&record.start_time()),
            record.model().unwrap_or("-"),
            record.text().replace('\n', " ")
        );
    }
    Ok(())
}

fn table(store: &JsonFileStore, json: bool, oldest_first: bool) -> CliResult<()> {
    let options = if oldest_first {
        LoadOptions::file_order()
    } else {
        LoadOptions::default()
    };
    let table = store.load_table(&options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table.to_json_rows())?);
    } else {
        print!("{}", table.render_text());
    }
    Ok(())
}

/// Parses `key=value`, reading the value as integer, float, boolean, or text
/// in that order.
fn parse_assignment(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), parse_scalar(value.trim())))
}

fn parse_scalar(value: &str) -> FieldValue {
    if let Ok(int) = value.parse::<i64>() {
        return FieldValue::Int(int);
    }
    if let Ok(float) = value.parse::<f64>() {
        if float.is_finite() {
            return FieldValue::Float(float);
        }
    }
    match value {
        "true" => FieldValue::Bool(true),
        "false" => FieldValue::Bool(false),
        text => FieldValue::Text(text.to_string()),
    }
}
