use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ferry_agent::ollama::OllamaBackend;
use ferry_agent::openai::{ImageEncoding, OpenAiCompatBackend};
use ferry_agent::router::{ProviderRouter, ProviderSlot};
use ferry_agent::{AiProvider, ChatBackend};
use ferry_channels::{CachedResolver, DirectoryResolver, MemoryHistory, StaticDirectory, Transport};
use ferry_core::FerryConfig;
use ferry_dispatch::{ConversationWorkers, DispatchSettings, Dispatcher, ImageDescriber};
use ferry_plugins::PluginRegistry;

mod console;

#[derive(Parser, Debug)]
#[command(name = "ferry-gateway", about = "Plugin-chain chat bot gateway")]
struct Args {
    /// Path to ferry.toml (defaults to ~/.ferry/ferry.toml).
    #[arg(long, env = "FERRY_CONFIG")]
    config: Option<String>,

    /// Log replies instead of sending them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry_gateway=info,ferry_dispatch=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = FerryConfig::load(args.config.as_deref())?;
    let dry_run = args.dry_run || config.bot.dry_run;

    let provider = build_backend(&config).map(AiProvider::new);
    let describer = match (&provider, config.dispatch.describe_images) {
        (Some(provider), true) => Some(ImageDescriber::new(provider.clone())),
        (None, true) => {
            warn!("describe_images is set but no provider is configured");
            None
        }
        _ => None,
    };
    let plugins = PluginRegistry::from_config(&config.plugins, provider)?;

    let transport = Arc::new(console::ConsoleTransport::new(dry_run));
    let names = Arc::new(CachedResolver::new(DirectoryResolver::new(
        StaticDirectory::new(),
        config.bot.self_id.clone(),
        config.bot.display_name(),
    )));
    let mut dispatcher = Dispatcher::new(
        transport.clone(),
        Arc::new(MemoryHistory::new()),
        names,
        plugins,
        DispatchSettings::from_config(&config),
    );
    if let Some(describer) = describer {
        dispatcher = dispatcher.with_image_describer(describer);
    }
    let dispatcher = Arc::new(dispatcher);
    dispatcher.preload(config.history.preload_sessions).await;

    let workers = Arc::new(
        ConversationWorkers::new(dispatcher)
            .with_idle_timeout(Duration::from_secs(config.dispatch.worker_idle_secs)),
    );
    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    transport.start(inbound_tx).await?;
    info!(transport = transport.name(), dry_run, "ferry gateway running");

    let reader = {
        let workers = Arc::clone(&workers);
        tokio::spawn(async move { workers.run(inbound_rx).await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            transport.stop().await;
            workers.shutdown().await;
        }
        _ = reader => {
            info!("input closed, finishing queued messages");
            workers.drain().await;
        }
    }
    Ok(())
}

/// Build the backend chain from config.
///
/// Priority order: `providers.openai`, then `providers.openai_compat[*]` in
/// declaration order, then `providers.ollama`. More than one slot gives a
/// [`ProviderRouter`] that fails over in that order.
fn build_backend(config: &FerryConfig) -> Option<Arc<dyn ChatBackend>> {
    let mut slots: Vec<ProviderSlot> = Vec::new();

    if let Some(ref openai) = config.providers.openai {
        info!(slot = slots.len(), base_url = %openai.base_url, model = %openai.model, "provider: openai");
        let mut backend = OpenAiCompatBackend::new(
            "openai",
            openai.api_key.clone(),
            &openai.base_url,
            &openai.chat_path,
            openai.model.clone(),
        )
        .with_sampling(openai.temperature, openai.top_p);
        if let Some(ref vision) = openai.vision_model {
            backend = backend.with_vision(vision.clone(), ImageEncoding::DataUrl);
        }
        slots.push(ProviderSlot::new(Box::new(backend), 1));
    }

    for entry in &config.providers.openai_compat {
        let known = ferry_agent::registry::lookup(&entry.id);

        let Some(base_url) = entry
            .base_url
            .clone()
            .or_else(|| known.map(|p| p.base_url.to_string()))
        else {
            warn!(id = %entry.id, "unknown provider with no base_url, skipping");
            continue;
        };
        let Some(model) = entry
            .model
            .clone()
            .or_else(|| known.map(|p| p.default_model.to_string()))
        else {
            warn!(id = %entry.id, "unknown provider with no model, skipping");
            continue;
        };
        let chat_path = entry
            .chat_path
            .clone()
            .or_else(|| known.map(|p| p.chat_path.to_string()))
            .unwrap_or_else(|| "/v1/chat/completions".to_string());

        info!(slot = slots.len(), id = %entry.id, endpoint = %format!("{base_url}{chat_path}"), %model, "provider: openai-compatible");
        let mut backend = OpenAiCompatBackend::new(
            entry.id.clone(),
            entry.api_key.clone(),
            &base_url,
            &chat_path,
            model,
        );
        let vision = entry
            .vision_model
            .clone()
            .or_else(|| known.and_then(|p| p.vision_model.map(String::from)));
        if let Some(vision) = vision {
            let encoding = known.map_or(ImageEncoding::DataUrl, |p| p.image_encoding);
            backend = backend.with_vision(vision, encoding);
        }
        slots.push(ProviderSlot::new(Box::new(backend), 1));
    }

    if let Some(ref ollama) = config.providers.ollama {
        info!(slot = slots.len(), base_url = %ollama.base_url, model = %ollama.model, "provider: ollama");
        slots.push(ProviderSlot::new(
            Box::new(OllamaBackend::new(
                Some(ollama.base_url.clone()),
                ollama.model.clone(),
            )),
            0,
        ));
    }

    match slots.len() {
        0 => {
            warn!("no provider configured, chat plugin unavailable");
            None
        }
        1 => Some(Arc::from(slots.remove(0).backend)),
        n => {
            info!(slots = n, "provider router enabled (automatic failover)");
            ProviderRouter::new(slots).map(|r| Arc::new(r) as Arc<dyn ChatBackend>)
        }
    }
}
