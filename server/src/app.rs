//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, Cli};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::sqlite::SqliteService;
use crate::domain::realtime::{ConnectionRegistry, Notifier};
use crate::domain::workflow::ReviewWorkflow;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub sqlite: SqliteService,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<Notifier>,
    pub workflow: Arc<ReviewWorkflow>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli = cli::parse();
        let app = Self::init(&cli).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &Cli) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let sqlite = SqliteService::init(&config.database_path).await?;

        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(
            config.heartbeat_secs,
        )));
        let notifier = Arc::new(Notifier::new(sqlite.pool().clone(), registry.clone()));
        let workflow = Arc::new(ReviewWorkflow::new(sqlite.pool().clone(), notifier.clone()));
        let shutdown = ShutdownService::new();

        Ok(Self {
            shutdown,
            config,
            sqlite,
            registry,
            notifier,
            workflow,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers before anything blocks
        app.shutdown.install_signal_handlers();

        let heartbeat = app.registry.start_heartbeat_task(app.shutdown.subscribe());
        app.shutdown.register(heartbeat).await;

        let server = ApiServer::new(app);
        let app = server.start().await?;

        app.shutdown.shutdown().await;
        app.sqlite.close().await;

        Ok(())
    }
}
