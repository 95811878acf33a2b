//! deskpilot - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deskpilot::{
    auth::GoogleAuth,
    config::Config,
    gemini::{GeminiClient, SlideDrafter},
    google::{DriveClient, SheetsClient, SlidesClient},
    server::{start_server, McpState},
    tools::{register_all, Services, ToolRegistry},
};

#[derive(Parser)]
#[command(name = "deskpilot", version, about = "MCP tool server for Google Sheets and Slides")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server (default).
    Serve,
    /// Run the browser OAuth flow and cache the token.
    Auth,
    /// List the tools this server exposes.
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deskpilot=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Auth => auth(config).await,
        Command::Tools => list_tools(config).await,
    }
}

async fn build_services(config: &Config) -> anyhow::Result<(Arc<GoogleAuth>, Arc<Services>)> {
    let auth = Arc::new(GoogleAuth::new(config.google.clone()).await?);

    let services = Arc::new(Services {
        drive: Arc::new(DriveClient::new(Arc::clone(&auth))),
        sheets: Arc::new(SheetsClient::new(Arc::clone(&auth))),
        slides: Arc::new(SlidesClient::new(Arc::clone(&auth))),
        gemini: GeminiClient::from_config(&config.gemini)
            .map(|client| Arc::new(client) as Arc<dyn SlideDrafter>),
        tab: config.sheet.tab.clone(),
    });

    Ok((auth, services))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let (auth, services) = build_services(&config).await?;

    if !auth.has_cached_token().await {
        tracing::warn!(
            "No cached Google token found. Run 'deskpilot auth' first or tool calls will fail."
        );
    }
    if services.gemini.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; AI slide tools will be unavailable");
    }

    let registry = Arc::new(ToolRegistry::new());
    register_all(&registry, services);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid MCP_HOST/MCP_PORT: {e}"))?;

    let state = Arc::new(McpState::new(registry));
    let bound = start_server(addr, Arc::clone(&state)).await?;
    tracing::info!("MCP server listening on http://{bound}/sse");

    tokio::signal::ctrl_c().await?;
    state.shutdown().await;
    Ok(())
}

async fn auth(config: Config) -> anyhow::Result<()> {
    let auth = GoogleAuth::new(config.google.clone()).await?;
    auth.run_browser_flow().await?;
    Ok(())
}

async fn list_tools(config: Config) -> anyhow::Result<()> {
    let (_auth, services) = build_services(&config).await?;
    let registry = ToolRegistry::new();
    register_all(&registry, services);

    for def in registry.tool_definitions().await {
        println!("{}\n    {}", def.name, def.description);
    }
    Ok(())
}
