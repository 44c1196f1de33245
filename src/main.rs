use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod config;
mod models;
mod output;
mod report;
mod runner;

use crate::backend::Backends;
use crate::config::{Config, Settings};
use crate::output::OutputFormat;
use crate::runner::{RunOptions, Runner};

/// Send evaluation prompts to LLM backends, then build a Markdown report from
/// the hand-annotated results
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output - debug logging for every backend request
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect responses from every configured model
    Run {
        /// Path to a TOML model/prompt configuration (built-in set if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the raw results file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Rewrite the results file after every prompt
        #[arg(long)]
        checkpoint: bool,

        /// Only evaluate these models (by name)
        #[arg(short, long, value_delimiter = ',')]
        models: Option<Vec<String>>,

        /// Only evaluate these categories
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        /// Wait for manual annotation, then generate the report
        #[arg(long)]
        wait: bool,
    },
    /// Generate the Markdown report from an annotated results file
    Report {
        /// Annotated `ai_evaluation_raw_results_*.json` file
        file: PathBuf,
    },
    /// Show the configured models and prompts
    List {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: plain or json
        #[arg(short, long, default_value = "plain")]
        output: OutputFormat,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::builtin(),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn wait_for_annotation(path: &Path) -> anyhow::Result<()> {
    println!(
        "\nIMPORTANT: Now, please open '{}', review each response,",
        path.display()
    );
    println!("and fill in the 'rating' and 'comments' fields for each entry.");
    println!("Press Enter after you have annotated the JSON file to generate the Markdown report...");

    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await?
    .context("Failed to read confirmation from stdin")
}

fn write_report(path: &Path) -> anyhow::Result<()> {
    let report = report::generate_report(path)?;
    println!("\nMarkdown report generated: {}", report.display());
    println!("Please review and customize the Markdown file as needed.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Run {
            config,
            output_dir,
            checkpoint,
            models,
            categories,
            wait,
        } => {
            let config = load_config(config.as_deref())?
                .select(models.as_deref(), categories.as_deref())?;
            let settings = Settings::from_env();
            tracing::debug!(?settings, "Backend settings");

            let backends = Backends::from_settings(&settings)?;
            let options = RunOptions {
                output_dir,
                checkpoint,
            };
            let outcome = Runner::new(config, backends, options).run().await?;
            output::print_run_summary(&outcome);

            if wait {
                wait_for_annotation(&outcome.path).await?;
                write_report(&outcome.path)?;
            }
        }
        Command::Report { file } => write_report(&file)?,
        Command::List { config, output } => {
            let config = load_config(config.as_deref())?;
            output::print_config(&config, output);
        }
    }

    Ok(())
}
