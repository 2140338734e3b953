use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use makama::{
    build_provider, chat, constants, web_server, Actions, ProviderConfig, ProviderKind,
};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Model backend selection. Unset flags fall back to the environment.
#[derive(clap::Args, Debug)]
struct ProviderArgs {
    #[arg(long, global = true, value_parser = parse_provider, help = "LLM provider: ollama or openai.")]
    provider: Option<ProviderKind>,
    #[arg(long, global = true, help = "Model name passed to the provider.")]
    model: Option<String>,
    #[arg(long, global = true, help = "Base URL of the Ollama server.")]
    ollama_url: Option<String>,
    #[arg(long, global = true, help = "Base URL of the OpenAI-compatible API.")]
    openai_url: Option<String>,
    #[arg(long, global = true, help = "HTTP timeout for provider calls, in seconds.")]
    timeout_secs: Option<u64>,
}

fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    ProviderKind::parse(s).ok_or_else(|| format!("unknown provider `{}` (expected ollama or openai)", s))
}

impl ProviderArgs {
    fn into_config(self) -> Result<ProviderConfig> {
        let kind = match self.provider {
            Some(kind) => kind,
            None => parse_provider(&constants::MAKAMA_PROVIDER).map_err(anyhow::Error::msg)?,
        };
        Ok(ProviderConfig {
            kind,
            model: self.model.unwrap_or_else(|| constants::MAKAMA_MODEL.clone()),
            ollama_url: self.ollama_url.unwrap_or_else(|| constants::OLLAMA_URL.clone()),
            openai_url: self.openai_url.unwrap_or_else(|| constants::OPENAI_BASE_URL.clone()),
            openai_api_key: constants::OPENAI_API_KEY.clone(),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(*constants::MAKAMA_TIMEOUT_SECS)),
        })
    }
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the Makama web UI.
    Serve {
        #[arg(long, env = "MAKAMA_PORT", default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding the page templates.")]
        templates: PathBuf,
        #[arg(long, default_value = "static", help = "Directory holding static assets.")]
        static_dir: PathBuf,
    },
    /// Chat with Makama in the terminal.
    Chat,
    /// Conjure a theme from a prompt and print it as JSON.
    Style {
        #[arg(help = "Free-text description of the desired look.")]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for provider credentials)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,makama=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Makama starting with command: {:?}", cli.command);

    let config = cli.provider.into_config()?;
    info!(provider = config.kind.as_str(), model = %config.model, "Using LLM provider");
    let provider = build_provider(&config).context("Failed to initialize LLM provider")?;
    let actions = Actions::new(provider);

    match cli.command {
        Commands::Serve {
            port,
            templates,
            static_dir,
        } => {
            info!("Starting Makama web UI on port {}...", port);
            let state = web_server::AppState::new(actions, templates);

            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, state, &static_dir).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat => {
            chat::run_terminal_chat(actions)
                .await
                .context("Chat session failed")?;
        }
        Commands::Style { prompt } => {
            chat::run_style_once(actions, &prompt).await?;
        }
    }

    Ok(())
}
