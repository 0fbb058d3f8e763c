use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use allow_only_one::logging::{self, LogFormat};
use allow_only_one::report::{print_header, print_summary, print_violation};

#[derive(Parser, Debug)]
#[command(name = "allow-only-one")]
#[command(about = "Checks records for duplicate field value combinations before they are saved")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a candidate record against the corpus
    Check {
        /// Path to the uniqueness settings file (.toml)
        #[arg(short, long)]
        settings: PathBuf,

        /// Path to the SQLite corpus of existing records
        #[arg(short, long)]
        corpus: PathBuf,

        /// Path to the candidate record (.json)
        #[arg(short, long)]
        record: PathBuf,
    },
    /// Load existing records into the corpus
    Import {
        /// Path to the SQLite corpus (created if missing)
        #[arg(short, long)]
        corpus: PathBuf,

        /// Path to a JSON array of records
        #[arg(short, long)]
        records: PathBuf,
    },
}

fn run_check(settings: PathBuf, corpus: PathBuf, record: PathBuf) -> anyhow::Result<ExitCode> {
    let (candidate, violations) = allow_only_one::check_record(&settings, &corpus, &record)
        .with_context(|| format!("checking {}", record.display()))?;

    print_header(&settings, &corpus, &candidate);
    for (index, violation) in violations.iter().enumerate() {
        print_violation(index, violation);
    }
    print_summary(&violations);

    // Exit with error code if conflicts were found
    if violations.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

fn run_import(corpus: PathBuf, records: PathBuf) -> anyhow::Result<ExitCode> {
    let count = allow_only_one::import_records(&corpus, &records)
        .with_context(|| format!("importing {}", records.display()))?;
    println!("Imported {} record(s) into {}", count, corpus.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let result = match cli.command {
        Command::Check {
            settings,
            corpus,
            record,
        } => run_check(settings, corpus, record),
        Command::Import { corpus, records } => run_import(corpus, records),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
