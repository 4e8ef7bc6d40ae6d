//! Configuration for the StudyShala server and its command-line client.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. Running the binary without a subcommand is the same as
//! `serve`.
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 5000)
//! - `NODE_ENV` - `production` or anything else for development
//! - `FRONTEND_URL` - Extra origin admitted by the CORS gate
//! - `SESSION_SECRET` - Key used to sign session cookies (required in production)
//! - `USERS_FILE` - JSON seed file for the user store
//! - `LOG_DIR` - Directory for `server.log` (default: logs)
//! - `VITE_API_URL` - Server base URL used by the client commands

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::warn;

use crate::session::DEFAULT_SWEEP_INTERVAL;
use crate::token::generate_secure_token;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default location of the client's persisted credentials.
pub const DEFAULT_TOKEN_FILE: &str = ".studyshala/session.json";

/// Configuration errors reported before the server starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SESSION_SECRET is required when NODE_ENV=production")]
    MissingSessionSecret,

    #[error("SESSION_SECRET must not be empty")]
    EmptySessionSecret,

    #[error("FRONTEND_URL '{0}' is not a valid URL")]
    InvalidFrontendUrl(String),

    #[error("session sweep interval must be greater than 0")]
    InvalidSweepInterval,
}

// =============================================================================
// Environment
// =============================================================================

/// Deployment environment, read from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    /// `production` (any case) selects production; everything else is development.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(Environment::Production)
        } else {
            Ok(Environment::Development)
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// StudyShala - session-authenticated API server for the StudyShala portal.
#[derive(Parser, Debug)]
#[command(name = "studyshala")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the API server
    Serve(ServeConfig),

    /// Print an Argon2 hash for a password, for use in the users file
    HashPassword(HashPasswordConfig),

    /// Log in against a running server and store the session token
    Login(LoginConfig),

    /// End the stored session
    Logout(ClientConfig),

    /// Show the principal of the stored session
    Whoami(ClientConfig),
}

/// Server configuration.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Deployment environment (`production` enables secure cookies).
    #[arg(long = "env", default_value = "development", env = "NODE_ENV")]
    pub environment: Environment,

    /// Frontend origin admitted by CORS in addition to the local dev servers.
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    // =========================================================================
    // Session Configuration
    // =========================================================================
    /// Secret key used to sign session cookies.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Seconds between sweeps of expired sessions.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs(), env = "SESSION_SWEEP_SECS")]
    pub session_sweep_secs: u64,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// JSON file of principals loaded into the user store at startup.
    #[arg(long, env = "USERS_FILE")]
    pub users_file: Option<PathBuf>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Directory for the log file.
    #[arg(long, default_value = DEFAULT_LOG_DIR, env = "LOG_DIR")]
    pub log_dir: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.session_secret.as_deref() {
            None if self.environment.is_production() => {
                return Err(ConfigError::MissingSessionSecret)
            }
            Some(secret) if secret.trim().is_empty() => {
                return Err(ConfigError::EmptySessionSecret)
            }
            _ => {}
        }

        if let Some(ref frontend_url) = self.frontend_url {
            if url::Url::parse(frontend_url).is_err() {
                return Err(ConfigError::InvalidFrontendUrl(frontend_url.clone()));
            }
        }

        if self.session_sweep_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured frontend origin without a trailing slash.
    pub fn frontend_origin(&self) -> Option<String> {
        self.frontend_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
    }

    /// The secret to sign sessions with.
    ///
    /// Outside production a missing secret is replaced by a random one, so
    /// sessions do not survive a restart.
    pub fn resolve_session_secret(&self) -> String {
        match self.session_secret {
            Some(ref secret) => secret.clone(),
            None => {
                warn!("SESSION_SECRET not set; using a random per-process secret");
                generate_secure_token()
            }
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}

/// Arguments for `hash-password`.
#[derive(Args, Debug, Clone)]
pub struct HashPasswordConfig {
    /// Password to hash.
    pub password: String,
}

/// Options shared by the client commands.
#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (without `/api`).
    #[arg(long, env = "VITE_API_URL")]
    pub api_url: Option<String>,

    /// File holding the stored token and user.
    #[arg(long, default_value = DEFAULT_TOKEN_FILE, env = "STUDYSHALA_TOKEN_FILE")]
    pub token_file: PathBuf,
}

/// Arguments for `login`.
#[derive(Args, Debug, Clone)]
pub struct LoginConfig {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Login identifier.
    #[arg(short, long)]
    pub identifier: String,

    /// Password.
    #[arg(long, env = "STUDYSHALA_PASSWORD", hide_env_values = true)]
    pub password: String,
}

// =============================================================================
// Tests
// =============================================================================
