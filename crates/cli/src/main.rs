//! CuraLink CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config file
//! - `doctor`: Diagnose configuration and provider setup
//! - `chat`: Interactive consultation chat
//! - `summarize`: Summarize consultation text
//! - `transcribe`: Transcribe a recorded consultation
//! - `suggest`: Follow-up suggestions for a summary
//! - `recommend`: Recommend a specialty for symptoms
//! - `gateway`: Start the HTTP API server

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "curalink",
    about = "CuraLink - telehealth consultation flows",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Diagnose configuration health
    Doctor,

    /// Chat with a doctor
    Chat {
        /// Use canned replies instead of the chat flow
        #[arg(long)]
        simulated: bool,
    },

    /// Summarize consultation text (reads stdin when no text is given)
    Summarize {
        text: Option<String>,
    },

    /// Transcribe a recorded consultation
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,

        /// MIME type, guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,

        /// Also summarize and suggest follow-ups
        #[arg(long)]
        debrief: bool,
    },

    /// Suggest follow-up actions for a consultation summary
    Suggest {
        summary: Option<String>,
    },

    /// Recommend a medical specialty for symptoms
    Recommend {
        symptoms: String,

        /// Restrict to these specialties (defaults to the configured departments)
        #[arg(short, long = "specialty")]
        specialties: Vec<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Doctor => commands::doctor::run()?,
        Commands::Chat { simulated } => commands::chat::run(simulated).await?,
        Commands::Summarize { text } => commands::flows::summarize(text).await?,
        Commands::Transcribe {
            file,
            mime,
            debrief,
        } => commands::flows::transcribe(&file, mime, debrief).await?,
        Commands::Suggest { summary } => commands::flows::suggest(summary).await?,
        Commands::Recommend {
            symptoms,
            specialties,
        } => commands::flows::recommend(symptoms, specialties).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
    }

    Ok(())
}
