//! StudyShala - API server and command-line client.
//!
//! This binary starts the HTTP server and hosts the client commands.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use studyshala::{
    client::{resolve_base_url, ApiClient, ClientError, FileTokenStore, HistoryNavigator, LOGIN_PATH},
    config::{Cli, ClientConfig, Command, HashPasswordConfig, LoginConfig, ServeConfig},
    logging::{init_logging, install_panic_hook},
    server::{create_router, hash_password_blocking, AppState, RouterConfig},
    session::{spawn_sweeper, Clock, MemorySessionStore, SessionStore, SystemClock},
    store::{MemoryUserStore, UserStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::HashPassword(config) => run_hash_password(config),
        Command::Login(config) => run_login(config).await,
        Command::Logout(config) => run_logout(config).await,
        Command::Whoami(config) => run_whoami(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    let log_file = match init_logging(config.verbose, Some(config.log_dir.as_path())) {
        Ok(path) => path,
        Err(e) => {
            eprintln!(
                "Failed to open log directory {}: {}",
                config.log_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };
    install_panic_hook();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("StudyShala v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Environment: {}", config.environment);
    if let Some(ref path) = log_file {
        info!("  Log file: {}", path.display());
    }

    // Open stores
    let users: Arc<dyn UserStore> = match config.users_file {
        Some(ref path) => match MemoryUserStore::from_seed_file(path) {
            Ok(store) => {
                info!("  Users file: {}", path.display());
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to load users from {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("  No USERS_FILE configured; starting with an empty user store");
            Arc::new(MemoryUserStore::new())
        }
    };
    match users.count().await {
        Ok(count) => info!("  Principals: {}", count),
        Err(e) => {
            error!("User store unavailable: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let secret = config.resolve_session_secret();

    let state = AppState::new(users, sessions.clone(), secret, config.environment)
        .with_clock(clock.clone());

    let router_config = build_router_config(&config);
    for origin in router_config.cors.origins() {
        info!("  CORS origin: {}", origin);
    }
    let router = create_router(state, router_config);

    let sweeper = spawn_sweeper(sessions, clock, config.sweep_interval());

    // Bind and serve
    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            sweeper.abort();
            return ExitCode::FAILURE;
        }
    };

    info!("Server running on port {}", config.port);
    info!("Health check: http://{}/api/health", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    RouterConfig::new(config.frontend_origin().as_deref()).with_tracing(!config.no_tracing)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// =============================================================================
// Hash Password Command
// =============================================================================

fn run_hash_password(config: HashPasswordConfig) -> ExitCode {
    if config.password.is_empty() {
        eprintln!("Error: password must not be empty");
        return ExitCode::FAILURE;
    }

    match hash_password_blocking(&config.password) {
        Ok(hash) => {
            println!("{}", hash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Client Commands
// =============================================================================

fn build_client(config: &ClientConfig, start_page: &str) -> Result<ApiClient, ClientError> {
    let base_url = resolve_base_url(config.api_url.as_deref(), None);
    ApiClient::new(
        &base_url,
        Arc::new(FileTokenStore::new(&config.token_file)),
        Arc::new(HistoryNavigator::new(start_page)),
    )
}

fn report(result: Result<(), ClientError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::Status { status, message }) => {
            eprintln!("Error: {} ({})", message, status.as_u16());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_login(config: LoginConfig) -> ExitCode {
    let result = async {
        let client = build_client(&config.client, LOGIN_PATH)?;
        let login = client.login(&config.identifier, &config.password).await?;
        println!(
            "{} ({}, {})",
            login.message, login.user.identifier, login.user.role
        );
        println!("Token saved to {}", config.client.token_file.display());
        Ok::<(), ClientError>(())
    }
    .await;
    report(result)
}

async fn run_logout(config: ClientConfig) -> ExitCode {
    let result = async {
        let client = build_client(&config, "/")?;
        let response = client.logout().await?;
        println!("{}", response.message);
        Ok::<(), ClientError>(())
    }
    .await;
    report(result)
}

async fn run_whoami(config: ClientConfig) -> ExitCode {
    let result = async {
        let client = build_client(&config, "/")?;
        let me = client.me().await?;
        println!("{}", serde_json::to_string_pretty(&me.user)?);
        Ok::<(), ClientError>(())
    }
    .await;
    report(result)
}
