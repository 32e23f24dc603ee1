//! Bootstrap binary: loads configuration, wires the example plugins into a
//! server, and serves it over whichever transport was configured.

use chatmcp::demo_platform::DemoPlatformClient;
use chatmcp::env::{Cli, EnvConfig, TransportMode};
use chatmcp::plugins::{ChannelToolsPlugin, GuildToolsPlugin, ModerationPromptsPlugin, UserResourcesPlugin};
use chatmcp::PluginManager;
use chatmcp_server::server::ServerBuilder;
use chatmcp_server::transport::{router, serve_stdio, HttpState};
use clap::Parser;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("chatmcp: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let env = cli.apply(EnvConfig::load()?);
    let platform = DemoPlatformClient::seeded();

    let builder = ServerBuilder::new("chatmcp", env!("CARGO_PKG_VERSION"))
        .instructions("Exposes a chat platform's guilds, channels, users and messages as MCP tools, resources and prompts.");
    let builder = PluginManager::new()
        .with(Box::new(GuildToolsPlugin))
        .with(Box::new(ChannelToolsPlugin))
        .with(Box::new(UserResourcesPlugin))
        .with(Box::new(ModerationPromptsPlugin))
        .register_all(builder)?;

    let server = builder.build(platform).await?;
    server.start_lifespan(&env.chat_platform_token).await?;

    let result = match env.transport {
        TransportMode::Stdio => serve_stdio(server.clone()).await.map_err(anyhow::Error::from),
        TransportMode::Http => {
            let state = HttpState::new(server.clone());
            let listener = tokio::net::TcpListener::bind(&env.http_addr).await?;
            tracing::info!(addr = %env.http_addr, "listening");
            axum::serve(listener, router(state)).await.map_err(anyhow::Error::from)
        }
    };

    server.shutdown().await?;
    result
}

fn init_tracing(cli: &Cli) {
    let subscriber = tracing_subscriber::fmt().with_max_level(cli.tracing_level());
    match cli.log_format {
        Some(chatmcp::env::LogFormat::Json) => subscriber.json().init(),
        _ => subscriber.init(),
    }
}
