use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::matching::{
    DuplicatePolicy, HttpEmbedderConfig, Neo4jConfig, SearchConfig, SemanticConfig,
    VectorIndexSettings,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub search: SearchConfig,
    /// `None` when `NEO4J_URL` is unset; callers fall back to an in-memory roster.
    pub graph: Option<GraphBackendConfig>,
}

/// Everything needed to reach the Neo4j graph and its vector index.
#[derive(Debug, Clone)]
pub struct GraphBackendConfig {
    pub neo4j: Neo4jConfig,
    pub vector_index: VectorIndexSettings,
    pub embedder: HttpEmbedderConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            search: load_search()?,
            graph: load_graph()?,
        })
    }
}

fn load_search() -> Result<SearchConfig, ConfigError> {
    let defaults = SearchConfig::default();

    let top_k = parse_var("SEARCH_TOP_K", defaults.semantic.top_k)?;
    let identifier_field = env::var("SEARCH_IDENTIFIER_FIELD")
        .unwrap_or_else(|_| defaults.semantic.identifier_field.clone());
    let duplicates = match env::var("SEARCH_DUPLICATE_POLICY") {
        Ok(value) => {
            DuplicatePolicy::parse(&value).ok_or(ConfigError::InvalidDuplicatePolicy { value })?
        }
        Err(_) => defaults.duplicates,
    };

    Ok(SearchConfig {
        semantic: SemanticConfig {
            top_k,
            identifier_field,
        },
        duplicates,
        graph_timeout: parse_millis("SEARCH_GRAPH_TIMEOUT_MS", defaults.graph_timeout)?,
        vector_timeout: parse_millis("SEARCH_VECTOR_TIMEOUT_MS", defaults.vector_timeout)?,
    })
}

fn load_graph() -> Result<Option<GraphBackendConfig>, ConfigError> {
    let url = match env::var("NEO4J_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => return Ok(None),
    };

    let username = env::var("NEO4J_USERNAME").map_err(|_| ConfigError::MissingVar {
        key: "NEO4J_USERNAME",
    })?;
    let password = env::var("NEO4J_PASSWORD").map_err(|_| ConfigError::MissingVar {
        key: "NEO4J_PASSWORD",
    })?;
    let database = env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string());
    let timeout = parse_millis("NEO4J_TIMEOUT_MS", Duration::from_secs(15))?;

    let index_defaults = VectorIndexSettings::default();
    let vector_index = VectorIndexSettings {
        index_name: env::var("NEO4J_INDEX_NAME").unwrap_or(index_defaults.index_name),
        embedding_property: env::var("NEO4J_EMBEDDING_PROPERTY")
            .unwrap_or(index_defaults.embedding_property),
    };

    let embedder_defaults = HttpEmbedderConfig::default();
    let embedder = HttpEmbedderConfig {
        endpoint: env::var("EMBEDDING_ENDPOINT").unwrap_or(embedder_defaults.endpoint),
        api_key: env::var("EMBEDDING_API_KEY").ok(),
        model: env::var("EMBEDDING_MODEL").unwrap_or(embedder_defaults.model),
        timeout: embedder_defaults.timeout,
    };

    Ok(Some(GraphBackendConfig {
        neo4j: Neo4jConfig {
            url,
            username,
            password,
            database,
            timeout,
        },
        vector_index,
        embedder,
    }))
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_millis(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = parse_var(key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidDuplicatePolicy { value: String },
    MissingVar { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive integer")
            }
            ConfigError::InvalidDuplicatePolicy { value } => {
                write!(
                    f,
                    "SEARCH_DUPLICATE_POLICY must be 'merge' or 'reject', got '{value}'"
                )
            }
            ConfigError::MissingVar { key } => write!(f, "{key} is required when NEO4J_URL is set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidDuplicatePolicy { .. }
            | ConfigError::MissingVar { .. } => None,
        }
    }
}
