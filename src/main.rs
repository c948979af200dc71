//! `retry` - run a command repeatedly and print one table row per attempt.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use retry_exec::duration::parse_duration;
use retry_exec::view::Table;
use retry_exec::{cancel_after, cancel_on_signal, CommandSpec, Retry, RetryPolicy, Subscribe};

/// Run a command up to N times with bounded concurrency and print the results.
#[derive(Parser, Debug)]
#[command(name = "retry", version, about)]
struct Cli {
    /// Maximum number of executions
    #[arg(long, default_value_t = 1)]
    max: usize,

    /// Limits the total duration of all executions (e.g. 1h30m)
    #[arg(long, default_value = "24h", value_parser = parse_duration)]
    timeout: Duration,

    /// Sleep before every execution (e.g. 500ms)
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    sleep: Duration,

    /// Maximum number of concurrent executions
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("retry: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (name, args) = cli.command.split_first().context("missing command")?;
    let policy = RetryPolicy::new(cli.max)
        .with_delay(cli.sleep)
        .with_concurrency(cli.concurrency);
    let retry = Retry::builder(CommandSpec::with_args(name.as_str(), args.iter().cloned()), policy)
        .with_subscribers(subscribers())
        .build()
        .context("invalid retry policy")?;

    let token = CancellationToken::new();
    let signaled = cancel_on_signal(token.clone());
    let deadline = cancel_after(token.clone(), cli.timeout);

    let mut results = retry.run(token.clone());
    let mut table = Table::new(io::stdout());
    while let Some(result) = results.next().await {
        table.print_row(&result).context("failed to render result")?;
    }

    // Results are complete; release the watchers.
    token.cancel();
    if deadline.await.unwrap_or(false) {
        tracing::warn!(timeout = ?cli.timeout, "timeout reached");
    }
    if signaled.await.unwrap_or(false) {
        println!("exiting (signaled)");
    }
    Ok(())
}

fn subscribers() -> Vec<Arc<dyn Subscribe>> {
    #[cfg(feature = "logging")]
    {
        vec![Arc::new(retry_exec::LogWriter::new())]
    }
    #[cfg(not(feature = "logging"))]
    {
        Vec::new()
    }
}

/// Initialize tracing on stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}
