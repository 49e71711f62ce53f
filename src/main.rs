use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::executor::block_on;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use lacona_bridge::bridge::Request;
use lacona_bridge::capabilities::{files, index, music, system};
use lacona_bridge::config::load_settings;
use lacona_bridge::{logging, open_bridge, Bridge};

/// Lacona bridge - drive the native host from the command line
#[derive(Parser, Debug)]
#[command(name = "lacona-bridge")]
#[command(version)]
#[command(about = "Send operations and queries to the Lacona native host", long_about = None)]
struct Cli {
    /// Settings file (default: ~/.lacona/bridge.json)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Serve fixtures instead of contacting the host
    #[arg(long = "demo")]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved mode
    Mode,

    /// Send a one-shot operation and print the reply
    Call {
        /// Host operation name, e.g. `applescript`
        op: String,
        /// JSON payload
        #[arg(long = "payload", default_value = "{}")]
        payload: String,
    },

    /// Search file names and print result batches
    SearchFiles {
        text: String,
        /// Batches to print before cancelling (the first is always empty)
        #[arg(long = "batches", default_value_t = 2)]
        batches: usize,
    },

    /// List installed applications
    Apps {
        /// Directories to search; `~` is expanded against the host's home
        #[arg(long = "dir")]
        dirs: Vec<String>,
        #[arg(long = "batches", default_value_t = 2)]
        batches: usize,
    },

    /// Print the music library
    Music,

    /// Print a configuration property, then its changes
    Config {
        property: String,
        /// Values to print before unsubscribing
        #[arg(long = "changes", default_value_t = 1)]
        changes: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(bridge: &Bridge, command: Command) -> Result<()> {
    match command {
        Command::Mode => print_json(&bridge.mode()),
        Command::Call { op, payload } => {
            let payload: Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;
            let reply = bridge.call(Request::new(op, payload)).await?;
            print_json(&reply)
        }
        Command::SearchFiles { text, batches } => {
            let mut stream = files::search_files(bridge, &text)?.take(batches);
            while let Some(batch) = stream.next().await {
                print_json(&batch?)?;
            }
            Ok(())
        }
        Command::Apps { dirs, batches } => {
            let mut stream = index::fetch_applications(bridge, &dirs).await?.take(batches);
            while let Some(batch) = stream.next().await {
                print_json(&batch?)?;
            }
            Ok(())
        }
        Command::Music => print_json(&music::fetch_music(bridge).await?),
        Command::Config { property, changes } => {
            let mut feed = system::watch_config(bridge, &property).take(changes);
            while let Some(value) = feed.next().await {
                print_json(&value?)?;
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_settings(cli.config.as_deref());
    let mut settings = loaded.settings.clone();
    if cli.demo {
        settings.demo = true;
    }
    let _guard = logging::init(&settings.log_dir());
    loaded.report();

    let bridge = open_bridge(&settings)?;
    info!(mode = %bridge.mode(), command = ?cli.command, "Running command");

    block_on(run(&bridge, cli.command))
}
