use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use langshift_infrastructure::config_loader::load_dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod context;
mod logging;

use context::AppContext;

#[derive(Parser)]
#[command(name = "langshift")]
#[command(about = "langshift - migrate source code between languages with LLMs", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.config/langshift/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate every configured source with every configured model
    Run {
        /// Only run these model identifiers (repeatable)
        #[arg(long = "model")]
        models: Vec<String>,
    },
    /// Migrate a single local file with one model
    Migrate {
        file: PathBuf,
        #[arg(long)]
        model: String,
    },
    /// Answer one migration request given as JSON ({model, prompt, code})
    Request {
        /// Request file; read from stdin when omitted
        input: Option<PathBuf>,
    },
    /// Run the code extractor on a saved model response
    Extract {
        file: PathBuf,
        /// Preferred fence label, e.g. kotlin
        #[arg(long)]
        language: Option<String>,
    },
    /// List registered models
    Models,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let dotenv = load_dotenv();

    let command = match cli.command {
        Commands::Extract { file, language } => {
            let _logging = logging::init(cli.verbose, None);
            return commands::extract::run(&file, language.as_deref()).await;
        }
        command => command,
    };

    let context = AppContext::load(cli.config.as_deref())?;
    let mut logging = logging::init(cli.verbose, context.logs_dir().as_deref());
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    match command {
        Commands::Run { models } => {
            commands::run::run(&context, models, logging.take_run_events()).await
        }
        Commands::Migrate { file, model } => {
            commands::migrate::run(&context, &file, &model, logging.take_run_events()).await
        }
        Commands::Request { input } => commands::request::run(&context, input.as_deref()).await,
        Commands::Models => commands::models::run(&context),
        Commands::Extract { file, language } => {
            commands::extract::run(&file, language.as_deref()).await
        }
    }
}
