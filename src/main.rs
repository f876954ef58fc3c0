use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use fulcrum::{
    adapters::{DiscoveryStore, FileConfigProvider, authz_server, discovery_server},
    core::{AuthzEngine, Processor},
    metrics, tracing_setup,
    ports::{ConfigProvider, SnapshotSink},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Declarative document to load and watch
    #[clap(short, long, default_value = "gateway.toml")]
    config: String,

    /// Logical node identity snapshots are published under
    #[clap(long, default_value = "edge-node")]
    node_id: String,

    /// Bind address for the discovery read surface
    #[clap(long, default_value = "0.0.0.0:18000")]
    discovery_addr: String,

    /// Bind address for the authorization check service
    #[clap(long, default_value = "0.0.0.0:9002")]
    authz_addr: String,

    /// Human-friendly console logs instead of JSON
    #[clap(long)]
    console_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "gateway.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "gateway.toml")]
        config: String,
    },
    /// Start the control plane (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match &args.command {
        Some(Commands::Validate { config }) => {
            return validate_config_command(config).await;
        }
        Some(Commands::Init { config }) => {
            return init_config_command(config).await;
        }
        Some(Commands::Serve) | None => {
            // Continue with normal server startup
        }
    }

    if args.console_logs {
        tracing_setup::init_console_tracing("info")
            .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    } else {
        tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    }
    metrics::describe_metrics();

    let config_path = std::path::absolute(&args.config)
        .with_context(|| format!("Failed to resolve config path {}", args.config))?;
    tracing::info!(path = %config_path.display(), node_id = %args.node_id, "Starting Fulcrum");

    // Watcher registration must succeed even if the document itself is
    // missing; the first Create event will bring us up to date.
    let provider = Arc::new(
        FileConfigProvider::new(&config_path).context("Failed to create config provider")?,
    );

    let store = Arc::new(DiscoveryStore::new());
    let engine = Arc::new(AuthzEngine::new());

    let sink: Arc<dyn SnapshotSink> = store.clone();
    let mut processor = Processor::new(args.node_id.clone(), sink, engine.clone());

    // Initial load is tolerant: a broken or missing document at startup is
    // not fatal. The services come up serving denies and an empty store
    // until the first good reload.
    match provider.load_config().await {
        Ok(initial_config) => match processor.process(&initial_config).await {
            Ok(version) => {
                metrics::record_reload(true);
                tracing::info!(version, "Initial snapshot published");
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(error = %e, "Initial snapshot rejected; starting unconfigured");
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "No usable document at startup; starting unconfigured");
        }
    }

    // Reload task: consumes change events serially, one at a time.
    let events = provider.watch();
    let provider_for_reload: Arc<dyn ConfigProvider> = provider.clone();
    let reload_task = tokio::spawn(processor.run(provider_for_reload, events, config_path.clone()));

    // Only a failure to bind the listening ports is fatal from here on.
    let discovery_listener = tokio::net::TcpListener::bind(&args.discovery_addr)
        .await
        .with_context(|| format!("Failed to bind discovery address {}", args.discovery_addr))?;
    let authz_listener = tokio::net::TcpListener::bind(&args.authz_addr)
        .await
        .with_context(|| format!("Failed to bind authz address {}", args.authz_addr))?;

    tracing::info!(
        discovery_addr = %args.discovery_addr,
        authz_addr = %args.authz_addr,
        "Fulcrum serving"
    );

    let discovery_app = discovery_server::router(store.clone());
    let authz_app = authz_server::router(engine.clone());

    tokio::select! {
        result = axum::serve(discovery_listener, discovery_app) => {
            result.context("Discovery server error")?;
        }
        result = axum::serve(authz_listener, authz_app) => {
            result.context("Authz server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    reload_task.abort();
    tracing_setup::shutdown_tracing();

    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    use fulcrum::config::{ProxyConfigValidator, loader::parse_config_sync};

    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match parse_config_sync(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ProxyConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listeners: {}", config.listeners.len());
            println!("   • Routes: {}", config.routes.len());
            println!("   • Clusters: {}", config.clusters.len());
            println!(
                "   • Authorization Routes: {}",
                config
                    .authorization
                    .as_ref()
                    .map(|a| a.routes.len())
                    .unwrap_or(0)
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure names are unique within listeners, routes and clusters");
            println!("   • Give every route exactly one of cluster / cluster_header");
            println!("   • Check that every referenced route and cluster is defined");
            println!("   • Give every cluster at least one endpoint");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Fulcrum Control Plane Configuration

name = "edge"

# Listener served by the data plane
[[listeners]]
name = "ingress"
address = "0.0.0.0"
port = 10000
routes = ["api"]
# cert_file = "/etc/certs/tls.crt"
# key_file = "/etc/certs/tls.key"

# Routing rules; destination is a literal cluster or a selector header
[[routes]]
name = "api"
prefix = "/"
cluster_header = "x-route"

# Upstream clusters
[[clusters]]
name = "svc-a"
use_tls = false
discovery_kind = "strict_dns"   # static | strict_dns | logical_dns

[[clusters.endpoints]]
host = "svc-a.internal"
port = 8080

# External-authorization rules, keyed by destination cluster
[authorization]
owner = "edge"

[[authorization.routes]]
cluster = "svc-a"
required_token = "change-me"
# outgoing_token = "upstream-token"
# host_rewrite = "svc-a.example.com"
# [authorization.routes.additional_headers]
# x-tenant = "blue"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'fulcrum serve --config {config_path}' to start the control plane");
    Ok(())
}
