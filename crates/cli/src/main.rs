//! Tandem CLI - two cancellable task groups on a resizable worker pool.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tandem_control::{Controller, ControllerSnapshot};
use tandem_core::{Completion, ControllerConfig, GroupId, Outcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Two cancellable task groups sharing a resizable worker pool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial worker count (overrides the config file)
    #[arg(long)]
    pool_size: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console reading commands from stdin
    Console,
    /// Submit a batch of work, optionally cancel group A, wait until idle
    Demo {
        /// Magnitudes for group A (sequence aggregate)
        #[arg(long, num_args = 1.., allow_negative_numbers = true)]
        a: Vec<i32>,
        /// Magnitudes for group B (comparison sort)
        #[arg(long, num_args = 1.., allow_negative_numbers = true)]
        b: Vec<i32>,
        /// Cancel group A after this many milliseconds
        #[arg(long)]
        cancel_a_after_ms: Option<u64>,
        /// Print each completion as a JSON line
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(size) = cli.pool_size {
        config.initial_pool_size = size;
    }

    let controller = Controller::new(config)?;

    match cli.command {
        Commands::Console => console(&controller).await?,
        Commands::Demo { a, b, cancel_a_after_ms, json } => {
            demo(&controller, &a, &b, cancel_a_after_ms, json).await?
        }
    }

    Ok(())
}

/// A parsed console line.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleCommand {
    Submit(GroupId, String),
    Pool(i32),
    Cancel(GroupId),
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let arg = parts.next();

    match (head.as_str(), arg) {
        ("a", Some(text)) => Some(ConsoleCommand::Submit(GroupId::A, text.to_string())),
        ("b", Some(text)) => Some(ConsoleCommand::Submit(GroupId::B, text.to_string())),
        ("pool", Some(n)) => n.parse().ok().map(ConsoleCommand::Pool),
        ("cancel", Some(group)) => group.parse().ok().map(ConsoleCommand::Cancel),
        ("status", None) => Some(ConsoleCommand::Status),
        ("help", None) => Some(ConsoleCommand::Help),
        ("quit" | "exit", None) => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  a <n>        submit magnitude n to group A (sequence aggregate)");
    println!("  b <n>        submit magnitude n to group B (comparison sort)");
    println!("  pool <n>     resize the worker pool (0 means 1)");
    println!("  cancel a|b   cancel everything in flight in a group");
    println!("  status       show counters and pool size");
    println!("  quit");
}

fn print_snapshot(snapshot: &ControllerSnapshot) {
    println!("Tandem Status");
    println!("  Pool size: {}", snapshot.pool_size);
    println!(
        "  A: {} in flight, running={}, scope #{}",
        snapshot.a.in_flight, snapshot.a.running, snapshot.a.generation
    );
    println!(
        "  B: {} in flight, running={}, scope #{}",
        snapshot.b.in_flight, snapshot.b.running, snapshot.b.generation
    );
    println!("  Work in progress: {}", snapshot.work_in_progress);
}

fn format_completion(completion: &Completion) -> String {
    format!(
        "[{}] {}({}) {}",
        completion.submission.group, completion.submission.id, completion.submission.magnitude, completion.outcome
    )
}

/// Print aggregate flag publications and completions until aborted.
fn spawn_watcher(controller: &Controller) -> JoinHandle<()> {
    let mut busy = controller.work_in_progress();
    let mut completions = controller.completions();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = busy.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = *busy.borrow_and_update();
                    println!("work in progress: {}", value);
                }
                completion = completions.recv() => match completion {
                    Ok(completion) => println!("{}", format_completion(&completion)),
                    Err(RecvError::Lagged(missed)) => warn!("Missed {} completions", missed),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

async fn console(controller: &Controller) -> Result<()> {
    let watcher = spawn_watcher(controller);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_help();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            // Non-integer input is dropped by the controller
            Some(ConsoleCommand::Submit(group, text)) => {
                controller.submit_text(group, &text);
            }
            Some(ConsoleCommand::Pool(size)) => controller.set_pool_size(size),
            Some(ConsoleCommand::Cancel(group)) => controller.group(group).cancel_all(),
            Some(ConsoleCommand::Status) => print_snapshot(&controller.snapshot()),
            Some(ConsoleCommand::Help) => print_help(),
            Some(ConsoleCommand::Quit) => break,
            None => println!("Unknown command: {} (try `help`)", line.trim()),
        }
    }

    watcher.abort();
    Ok(())
}

async fn demo(
    controller: &Controller,
    a: &[i32],
    b: &[i32],
    cancel_a_after_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut completions = controller.completions();
    let total = a.len() + b.len();

    for &magnitude in a {
        controller.group(GroupId::A).submit(magnitude);
    }
    for &magnitude in b {
        controller.group(GroupId::B).submit(magnitude);
    }

    let cancel = async {
        match cancel_a_after_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(cancel);
    let mut cancel_fired = false;

    let mut finished = Vec::with_capacity(total);
    while finished.len() < total {
        tokio::select! {
            _ = &mut cancel, if !cancel_fired => {
                cancel_fired = true;
                info!("Cancelling group A");
                controller.cancel_a();
            }
            completion = completions.recv() => match completion {
                Ok(completion) => {
                    if json {
                        println!("{}", serde_json::to_string(&completion)?);
                    } else {
                        println!("{}", format_completion(&completion));
                    }
                    finished.push(completion);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Missed {} completions", missed);
                    break;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.wait_idle().await;

    if !json {
        println!("Summary ({} submissions)", total);
        for group in GroupId::ALL {
            let of_group: Vec<_> = finished.iter().filter(|c| c.submission.group == group).collect();
            let succeeded = of_group.iter().filter(|c| matches!(c.outcome, Outcome::Success { .. })).count();
            let cancelled = of_group.iter().filter(|c| c.outcome.is_cancelled()).count();
            let failed = of_group.len() - succeeded - cancelled;
            println!(
                "  {}: {} succeeded, {} cancelled, {} failed",
                group, succeeded, cancelled, failed
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_keeps_raw_text() {
        assert_eq!(parse_command("a 3"), Some(ConsoleCommand::Submit(GroupId::A, "3".to_string())));
        assert_eq!(parse_command("B abc"), Some(ConsoleCommand::Submit(GroupId::B, "abc".to_string())));
    }

    #[test]
    fn test_parse_pool_and_cancel() {
        assert_eq!(parse_command("pool 0"), Some(ConsoleCommand::Pool(0)));
        assert_eq!(parse_command("pool x"), None);
        assert_eq!(parse_command("cancel b"), Some(ConsoleCommand::Cancel(GroupId::B)));
        assert_eq!(parse_command("cancel c"), None);
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_command("status"), Some(ConsoleCommand::Status));
        assert_eq!(parse_command("exit"), Some(ConsoleCommand::Quit));
        assert_eq!(parse_command("a"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_cli_parses_negative_magnitudes() {
        let cli = Cli::try_parse_from(["tandem", "--pool-size", "2", "demo", "--a", "3", "-1", "--b", "2"]).unwrap();
        assert_eq!(cli.pool_size, Some(2));
        match cli.command {
            Commands::Demo { a, b, .. } => {
                assert_eq!(a, vec![3, -1]);
                assert_eq!(b, vec![2]);
            }
            _ => panic!("expected demo"),
        }
    }
}
