use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::logging::LogFormat;
use crate::token::{Lifetimes, TokenCodec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenStrategy {
    /// Readable payload with a keyed MD5 digest
    Signed,
    /// AES-256-GCM encrypted payload
    Sealed,
}

/// Command line and environment settings.
#[derive(Parser, Debug)]
#[command(name = "myadmin")]
#[command(about = "Browser-driven MySQL administration server")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, env = "MYADMIN_LISTEN", default_value = "0.0.0.0:9872")]
    pub listen: SocketAddr,

    /// Key that signs or encrypts session tokens
    #[arg(long, env = "MYADMIN_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "MYADMIN_TOKEN_STRATEGY", value_enum, default_value = "signed")]
    pub token_strategy: TokenStrategy,

    /// Access token lifetime in minutes
    #[arg(long, env = "MYADMIN_ACCESS_MINUTES", default_value_t = 14 * 24 * 60)]
    pub access_minutes: i64,

    /// Refresh token lifetime in minutes
    #[arg(long, env = "MYADMIN_REFRESH_MINUTES", default_value_t = 28 * 24 * 60)]
    pub refresh_minutes: i64,

    /// Largest page `select_rows` returns
    #[arg(long, env = "MYADMIN_MAX_LIMIT", default_value_t = 50)]
    pub max_limit: u64,

    /// Directory served under /web/
    #[arg(long, env = "MYADMIN_STATIC_DIR", default_value = "./web")]
    pub static_dir: PathBuf,

    #[arg(long, env = "MYADMIN_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Tables whose names start with this are left out of dumps
    #[arg(long, env = "MYADMIN_DUMP_EXCLUDE_PREFIX", default_value = "LOG")]
    pub dump_exclude_prefix: String,

    #[arg(long, env = "MYADMIN_LOG_FORMAT", value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("secret key must not be empty")]
    EmptySecret,
    #[error("max limit must be at least 1")]
    ZeroLimit,
    #[error("token lifetimes must be positive")]
    Lifetime,
}

/// Settings fixed at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub secret_key: String,
    pub token_strategy: TokenStrategy,
    pub lifetimes: Lifetimes,
    pub max_limit: u64,
    pub static_dir: PathBuf,
    pub connect_timeout: Duration,
    pub dump_exclude_prefix: String,
}

impl AppConfig {
    pub fn codec(&self) -> TokenCodec {
        match self.token_strategy {
            TokenStrategy::Signed => TokenCodec::signed(&self.secret_key),
            TokenStrategy::Sealed => TokenCodec::sealed(&self.secret_key),
        }
    }

    /// Whether `table` is left out of `dump_database`.
    pub fn excluded_from_dump(&self, table: &str) -> bool {
        let prefix = &self.dump_exclude_prefix;
        !prefix.is_empty()
            && table
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }
}

impl TryFrom<&Args> for AppConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        if args.secret_key.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if args.max_limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if args.access_minutes <= 0 || args.refresh_minutes <= 0 {
            return Err(ConfigError::Lifetime);
        }

        Ok(Self {
            listen: args.listen,
            secret_key: args.secret_key.clone(),
            token_strategy: args.token_strategy,
            lifetimes: Lifetimes {
                access_minutes: args.access_minutes,
                refresh_minutes: args.refresh_minutes,
            },
            max_limit: args.max_limit,
            static_dir: args.static_dir.clone(),
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            dump_exclude_prefix: args.dump_exclude_prefix.clone(),
        })
    }
}

impl AppConfig {
    /// Defaults with the given secret, for tests and embedding.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 9872)),
            secret_key: secret_key.into(),
            token_strategy: TokenStrategy::Signed,
            lifetimes: Lifetimes::default(),
            max_limit: 50,
            static_dir: PathBuf::from("./web"),
            connect_timeout: Duration::from_secs(10),
            dump_exclude_prefix: "LOG".to_string(),
        }
    }
}
