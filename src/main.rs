use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loqa_conversations::{
    create_router, AppState, ArchivalReconciler, ArchiveOutcome, Config, FsRecordStore,
    HeadlessAudio, NatsClient, NatsRemoteSessionService, NatsSummaryProvider, SessionController,
    StaticPermission,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "loqa-conversations")]
#[command(about = "Live agent conversations with automatic recording archival")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/loqa-conversations")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API (default)
    Serve,
    /// Archive the most recent conversation once and exit
    ArchiveLatest,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loqa Conversations v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let nats = NatsClient::connect(&cfg.nats.url).await?;
    let provider = Arc::new(NatsSummaryProvider::new(
        nats.clone(),
        Some(cfg.agent.agent_id.clone()),
    ));
    let store = Arc::new(FsRecordStore::open(cfg.store.root()).await?);
    info!("Record store: {}", store.root().display());

    let reconciler = Arc::new(ArchivalReconciler::new(
        provider,
        store,
        cfg.reconciler_config(),
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::ArchiveLatest => {
            // No session start is known after a restart: take the newest conversation
            match reconciler.archive_most_recent_conversation(None).await {
                Some(ArchiveOutcome::Archived {
                    conversation_id,
                    uri,
                    ..
                }) => info!("Archived {} to {}", conversation_id, uri),
                Some(outcome) => info!("Nothing archived: {:?}", outcome),
                None => {
                    let status = reconciler.status();
                    anyhow::bail!(
                        "Archival failed: {}",
                        status.last_error.unwrap_or_default()
                    );
                }
            }
            Ok(())
        }
        Command::Serve => {
            let controller = Arc::new(SessionController::new(
                Arc::new(NatsRemoteSessionService::new(nats)),
                Arc::new(StaticPermission::new(cfg.audio.microphone_allowed)),
                Arc::new(HeadlessAudio::new()),
                reconciler,
            ));

            let app = create_router(AppState::new(controller, cfg.agent.agent_id.clone()));

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP API listening on {}", addr);
            axum::serve(listener, app).await?;

            Ok(())
        }
    }
}
