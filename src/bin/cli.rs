//! handlekv CLI
//!
//! Runs text commands against a registry, one per line, from a script file
//! or stdin.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use handlekv::{Config, Operation, Registry, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// handlekv CLI
#[derive(Parser, Debug)]
#[command(name = "handlekv-cli")]
#[command(about = "Scripted front end for the handlekv store layer")]
#[command(version)]
struct Args {
    /// Read commands from this file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Store values without compression
    #[arg(long)]
    no_compress: bool,

    /// Page size reported by stat
    #[arg(short, long, default_value = "4096")]
    page_size: u32,

    /// fsync the environment log every N writes (0 = every write)
    #[arg(short, long, default_value = "100")]
    wal_sync_every: usize,

    /// Continue with the next command after an error
    #[arg(short, long)]
    keep_going: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,handlekv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let wal_sync_strategy = match args.wal_sync_every {
        0 => WalSyncStrategy::EveryWrite,
        count => WalSyncStrategy::EveryNEntries { count },
    };

    let config = Config::builder()
        .compress_values(!args.no_compress && cfg!(feature = "compression"))
        .page_size(args.page_size)
        .wal_sync_strategy(wal_sync_strategy)
        .build();

    let mut registry = match Registry::new(config) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                tracing::error!("Failed to open script {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let status = run(&mut registry, input, args.keep_going);

    if let Err(e) = registry.close_all() {
        tracing::error!("Shutdown error: {}", e);
        return ExitCode::FAILURE;
    }
    status
}

/// Execute each non-blank, non-comment line in order
fn run(registry: &mut Registry, input: Box<dyn BufRead>, keep_going: bool) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;

    for (number, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let result = Operation::parse(line).and_then(|op| registry.execute(op));
        match result {
            Ok(outcome) => {
                if writeln!(out, "{}", outcome).is_err() {
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                eprintln!("line {}: error: {}", number + 1, e);
                failed = true;
                if !keep_going {
                    break;
                }
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
