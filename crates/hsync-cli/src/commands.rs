use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use hsync_directory::HandleDirectory;
use hsync_server::{HsyncServer, ServerConfig};
use hsync_store::FileDirectoryStore;
use hsync_sync::{ChannelTransport, EngineConfig, EngineHost, IdleEngine};
use hsync_types::PeerId;
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Lookup(args) => cmd_lookup(config, args, &cli.format).await,
        Command::Assign(args) => cmd_assign(config, args, &cli.format).await,
        Command::PeerId => cmd_peer_id(&cli.format),
    }
}

/// Defaults, then the TOML file, then the environment, then `--data-dir`.
fn load_config(file: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let config = match file {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

async fn open_directory(config: &ServerConfig) -> anyhow::Result<HandleDirectory> {
    let root = config.directory_dir();
    let store = FileDirectoryStore::open(&root)
        .await
        .with_context(|| format!("opening directory store at {}", root.display()))?;
    Ok(HandleDirectory::new(Arc::new(store)))
}

/// Overlay `--port` and `--allow-origin` on the resolved config.
fn apply_serve_args(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<ServerConfig> {
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if !args.allow_origins.is_empty() {
        config.allowed_origins = args.allow_origins;
        config.validate()?;
    }
    Ok(config)
}

async fn cmd_serve(config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    let config = apply_serve_args(config, args)?;

    let engine_config = EngineConfig::new(PeerId::from_hostname(), config.documents_dir());
    engine_config
        .prepare_storage()
        .await
        .with_context(|| format!("creating {}", config.documents_dir().display()))?;

    println!("{} hsync gateway", "▶".green().bold());
    println!("  Peer: {}", engine_config.peer_id.to_string().cyan());
    println!("  Data: {}", config.data_dir.display().to_string().bold());
    println!("  Bind: {}", config.bind_addr.to_string().bold());

    let (transport, receiver) = ChannelTransport::new();
    let host = EngineHost::new(IdleEngine, engine_config);
    tokio::spawn(async move { host.run(receiver).await });

    let server = HsyncServer::open(config, Arc::new(transport)).await?;
    server.run_until_shutdown().await?;
    println!("{} stopped", "✓".green());
    Ok(())
}

async fn cmd_lookup(config: ServerConfig, args: LookupArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let directory = open_directory(&config).await?;
    let handle = directory.lookup(&args.iid).await?;
    match format {
        OutputFormat::Json => {
            let result = handle.map_or(json!(false), |h| json!(h.as_str()));
            println!("{}", json!({ "result": result }));
        }
        OutputFormat::Text => match handle {
            Some(h) => println!("{} → {}", args.iid.bold(), h.as_str().yellow()),
            None => println!("{} {}", args.iid.bold(), "not assigned".dimmed()),
        },
    }
    Ok(())
}

async fn cmd_assign(config: ServerConfig, args: AssignArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let directory = open_directory(&config).await?;
    directory.assign(&args.iid, &args.handle).await?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "result": true })),
        OutputFormat::Text => println!(
            "{} {} → {}",
            "✓".green().bold(),
            args.iid.bold(),
            args.handle.yellow()
        ),
    }
    Ok(())
}

fn cmd_peer_id(format: &OutputFormat) -> anyhow::Result<()> {
    let peer = PeerId::from_hostname();
    match format {
        OutputFormat::Json => println!("{}", json!({ "peer_id": peer.as_str() })),
        OutputFormat::Text => println!("{}", peer.as_str().cyan()),
    }
    Ok(())
}
