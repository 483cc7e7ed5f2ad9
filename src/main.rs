use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use chatgate::auth::{AccessGate, MemorySessionStore, ProviderClient};
use chatgate::config::{AuthConfig, ServerConfig};
use chatgate::server::{AppState, create_router};
use chatgate::store::{SqliteStore, Store};
use chatgate::types::StoreConfig;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "chatgate")]
#[command(about = "Session and identity gateway for a chat service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and default config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Identity provider config file. Defaults to <data-dir>/chatgate.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host name that admits anonymous visitors (overrides the config file)
        #[arg(long)]
        public_domain: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create the database and the tenant's default store)
    Init {
        /// Data directory for the database and default config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Name of the default store
        #[arg(long, default_value = "default")]
        store_name: String,

        /// Storage namespace that owns conversations
        #[arg(long, default_value = "admin")]
        tenant: String,
    },
}

fn run_init(data_dir: String, store_name: String, tenant: String) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let config = ServerConfig {
        data_dir: data_path,
        ..Default::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if let Some(existing) = store.get_default_store_config(&tenant)? {
        bail!(
            "Server already initialized. Tenant '{tenant}' already has store '{}'.",
            existing.name
        );
    }

    store.create_store_config(&StoreConfig {
        owner: tenant.clone(),
        name: store_name.clone(),
        display_name: "Default Store".to_string(),
        is_default: true,
        created_time: Utc::now(),
    })?;

    let config_file = config.auth_config_path();
    if !config_file.exists() {
        let template = AuthConfig {
            tenant: tenant.clone(),
            ..Default::default()
        };
        fs::write(&config_file, toml::to_string_pretty(&template)?)?;
        println!("Wrote config template to {}", config_file.display());
    }

    println!("Created default store '{tenant}/{store_name}'");
    println!("Database: {}", config.db_path().display());

    Ok(())
}

async fn run_serve(config: ServerConfig, public_domain: Option<String>) -> anyhow::Result<()> {
    let mut auth = AuthConfig::load(&config.auth_config_path())?;
    if let Some(domain) = public_domain {
        auth.public_domain = domain;
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if store.get_default_store_config(&auth.tenant)?.is_none() {
        bail!(
            "Server not initialized. Run 'chatgate admin init --tenant {}' first to create the default store.",
            auth.tenant
        );
    }
    let store: Arc<dyn Store> = Arc::new(store);

    let sessions = Arc::new(
        MemorySessionStore::new(auth.session_ttl())
            .with_anonymous_ttl(auth.anonymous_session_ttl()),
    );
    let exchange = Arc::new(ProviderClient::new(&auth)?);
    let gate = AccessGate::from_config(&auth, store.clone(), exchange, sessions.clone())?;

    if auth.public_mode_enabled() {
        info!("Anonymous access enabled for host {}", auth.public_domain);
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                debug!("Purged {purged} expired session(s)");
            }
        }
    });

    if !auth.trusted_proxies.is_empty() {
        info!("Trusting forwarding headers from {:?}", auth.trusted_proxies);
    }
    let state = AppState::new(store, gate).with_trusted_proxies(auth.trusted_proxies.clone());
    let app = create_router(Arc::new(state));
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chatgate=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                store_name,
                tenant,
            } => {
                run_init(data_dir, store_name, tenant)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
            public_domain,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                config_path: config,
            };
            run_serve(config, public_domain).await?;
        }
    }

    Ok(())
}
