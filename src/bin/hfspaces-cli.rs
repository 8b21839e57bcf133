//! hfspaces CLI - Inspect and invoke Gradio apps hosted on Spaces
//!
//! Provides subcommands for printing the inferred function schemas of a
//! Space and for calling one of its functions through the queue.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use hfspaces::client::invoke_with_progress;
use hfspaces::space::{DEFAULT_SOURCE_PATH, HttpFetcher, LocalFetcher, SourceFetcher};
use hfspaces::{ApplicationModel, Settings};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hfspaces")]
#[command(about = "Schema inference and invocation for Gradio Spaces", long_about = None)]
struct Cli {
    /// Base URL Space repositories are served from
    #[arg(long, global = true)]
    hub_url: Option<String>,

    /// Host suffix of the queue WebSocket endpoint
    #[arg(long, global = true)]
    ws_host: Option<String>,

    /// Repository branch to read sources from
    #[arg(long, global = true)]
    branch: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the endpoint and function schemas of a Space as JSON
    Schema {
        /// Space owner
        owner: String,

        /// Space name
        space: String,

        /// Application file within the Space repository
        #[arg(long, default_value = DEFAULT_SOURCE_PATH)]
        path: String,

        /// Analyze a local file instead of downloading the source
        #[arg(long)]
        source_file: Option<PathBuf>,
    },

    /// Invoke one function of a Space and print its output
    Invoke {
        /// Space owner
        owner: String,

        /// Space name
        space: String,

        /// JSON payload, usually an array with one entry per input
        #[arg(long)]
        data: String,

        /// Function index as listed by `schema`
        #[arg(long, default_value = "0")]
        fn_index: usize,

        /// Application file within the Space repository
        #[arg(long, default_value = DEFAULT_SOURCE_PATH)]
        path: String,

        /// Analyze a local file instead of downloading the source
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(hub_url) = &self.hub_url {
            settings.hub_url = hub_url.clone();
        }
        if let Some(ws_host) = &self.ws_host {
            settings.ws_host = ws_host.clone();
        }
        if let Some(branch) = &self.branch {
            settings.branch = branch.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command {
        Commands::Schema {
            owner,
            space,
            path,
            source_file,
        } => {
            let model = tokio::task::spawn_blocking(move || {
                load_model(&owner, &space, &path, source_file.as_deref(), &settings)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&model)?);
        }

        Commands::Invoke {
            owner,
            space,
            data,
            fn_index,
            path,
            source_file,
            timeout_secs,
        } => {
            let data: Value = serde_json::from_str(&data).context("--data is not valid JSON")?;
            let task = tokio::task::spawn_blocking(move || -> Result<Option<Value>> {
                let model = load_model(&owner, &space, &path, source_file.as_deref(), &settings)?;
                let output = invoke_with_progress(&model, fn_index, data, |estimate| {
                    if let Some(rank) = estimate.rank {
                        eprintln!("queue position: {rank}");
                    }
                })?;
                Ok(output)
            });

            let joined = match timeout_secs {
                Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        // The blocking read cannot be cancelled; leave without waiting on it
                        eprintln!("Error: invocation timed out after {secs}s");
                        std::process::exit(2);
                    }
                },
                None => task.await,
            };

            match joined?? {
                Some(output) => println!("{}", serde_json::to_string_pretty(&output)?),
                None => return Err(anyhow!("the Space did not start the queue exchange")),
            }
        }
    }

    Ok(())
}

fn load_model(
    owner: &str,
    space: &str,
    path: &str,
    source_file: Option<&Path>,
    settings: &Settings,
) -> Result<ApplicationModel> {
    let model = match source_file {
        Some(file) => {
            let name = file
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("{} does not name a file", file.display()))?;
            let fetcher = LocalFetcher::new(file.parent().unwrap_or_else(|| Path::new(".")));
            tracing::debug!(root = %fetcher.root().display(), file = name, "reading local source");
            build(owner, space, name, &fetcher, settings)?
        }
        None => build(owner, space, path, &HttpFetcher::new(settings)?, settings)?,
    };
    Ok(model)
}

fn build(
    owner: &str,
    space: &str,
    path: &str,
    fetcher: &dyn SourceFetcher,
    settings: &Settings,
) -> Result<ApplicationModel> {
    ApplicationModel::build(owner, space, path, fetcher, settings)
        .with_context(|| format!("failed to analyze {owner}/{space}"))
}
