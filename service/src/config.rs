use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default NATS endpoint used when `NATS_URL` is not set.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Header carrying the pre-validated identity claim for `GET /subscribe`.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-client-identity";

const NATS_URL_SCHEMES: [&str; 4] = ["nats://", "tls://", "ws://", "wss://"];

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Reasons a configuration is rejected before the gateway starts.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    ZeroKeepAlive,
    ZeroSinkCapacity,
    EmptySubject,
    EmptyIdentityHeader,
    UnsupportedNatsUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::ZeroKeepAlive => write!(f, "keep-alive interval must be at least 1 second"),
            ConfigError::ZeroSinkCapacity => write!(f, "sink capacity must be at least 1"),
            ConfigError::EmptySubject => write!(f, "bus subject must not be empty"),
            ConfigError::EmptyIdentityHeader => write!(f, "identity header name must not be empty"),
            ConfigError::UnsupportedNatsUrl(url) => write!(
                f,
                "NATS URL {url:?} must start with one of {}",
                NATS_URL_SCHEMES.join(", ")
            ),
        }
    }
}

impl StdError for ConfigError {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// The NATS server to subscribe to for responses
    #[arg(short, long, env, default_value = DEFAULT_NATS_URL)]
    nats_url: String,

    /// The bus subject that backend services publish client responses on
    #[arg(short, long, env, default_value = sse::ingest::RESPONSE_SUBJECT)]
    subject: String,

    /// Name of the request header holding the `{"userid", "clientid"}` identity claim
    #[arg(long, env, default_value = DEFAULT_IDENTITY_HEADER)]
    identity_header: String,

    /// Seconds between keep-alive comments on an idle event stream
    #[arg(long, env, default_value_t = 25)]
    pub keep_alive_secs: u64,

    /// Events a single connection may queue before newer ones are dropped
    #[arg(long, env, default_value_t = 64)]
    pub sink_capacity: usize,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Checks the settings the core depends on. Called before anything connects or binds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::ZeroKeepAlive);
        }
        if self.sink_capacity == 0 {
            return Err(ConfigError::ZeroSinkCapacity);
        }
        if self.subject.trim().is_empty() {
            return Err(ConfigError::EmptySubject);
        }
        if self.identity_header.trim().is_empty() {
            return Err(ConfigError::EmptyIdentityHeader);
        }
        if !NATS_URL_SCHEMES
            .iter()
            .any(|scheme| self.nats_url.starts_with(scheme))
        {
            return Err(ConfigError::UnsupportedNatsUrl(self.nats_url.clone()));
        }
        Ok(())
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn nats_url(&self) -> &str {
        &self.nats_url
    }

    pub fn set_nats_url(mut self, nats_url: String) -> Self {
        self.nats_url = nats_url;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn identity_header(&self) -> &str {
        &self.identity_header
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}
