use crate::processor::FallbackPolicy;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
///
/// Every section has a full set of defaults, so an empty file (or no file at
/// all) yields a working single-node setup. Any value can be overridden with
/// an environment variable carrying the `DOCKET_` prefix and `__` as the
/// section separator, e.g. `DOCKET_SERVER__PORT=9090`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub processors: ProcessorsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("docket.db")
}

/// Attachment storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachments_dir: default_attachments_dir(),
        }
    }
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("attachments")
}

/// Extraction stage configuration
///
/// Without an analyzer endpoint the stage runs the built-in pattern strategy
/// only; `method = "analyzer"` requests are rejected.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Document analyzer service URL (e.g., "http://analyzer:9200/extract")
    #[serde(default)]
    pub analyzer_endpoint: Option<String>,
    /// Analyzer API key, sent as the `x-api-key` header
    #[serde(default)]
    pub analyzer_api_key: Option<String>,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            analyzer_endpoint: None,
            analyzer_api_key: None,
            timeout_secs: default_extraction_timeout(),
        }
    }
}

fn default_extraction_timeout() -> u64 {
    60
}

/// External processor configuration for the AI and invoice stages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorsConfig {
    /// AI enrichment agent URL; unset means simulate locally
    #[serde(default)]
    pub ai_endpoint: Option<String>,
    #[serde(default)]
    pub ai_api_key: Option<String>,
    /// Invoice agent URL; unset means simulate locally
    #[serde(default)]
    pub invoice_endpoint: Option<String>,
    #[serde(default)]
    pub invoice_api_key: Option<String>,
    /// Request timeout in seconds (default: 240)
    #[serde(default = "default_processor_timeout")]
    pub timeout_secs: u64,
    /// What to do when a configured endpoint fails (default: simulate)
    #[serde(default)]
    pub fallback: FallbackPolicy,
    /// JSON file replacing the built-in vendor/product/department registries
    #[serde(default)]
    pub code_mappings: Option<PathBuf>,
}

impl Default for ProcessorsConfig {
    fn default() -> Self {
        Self {
            ai_endpoint: None,
            ai_api_key: None,
            invoice_endpoint: None,
            invoice_api_key: None,
            timeout_secs: default_processor_timeout(),
            fallback: FallbackPolicy::default(),
            code_mappings: None,
        }
    }
}

fn default_processor_timeout() -> u64 {
    240
}

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Run extraction automatically after a ticket with an attachment is
    /// submitted. Later stages always require an explicit trigger.
    #[serde(default = "default_auto_extract")]
    pub auto_extract: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_extract: default_auto_extract(),
        }
    }
}

fn default_auto_extract() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogConfig {
    /// Emit log lines as JSON instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub extraction: SanitizedExtractionConfig,
    pub processors: SanitizedProcessorsConfig,
    pub orchestrator: OrchestratorConfig,
    pub log: LogConfig,
}

/// Sanitized extraction config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExtractionConfig {
    pub analyzer_endpoint: Option<String>,
    pub analyzer_api_key_configured: bool,
    pub timeout_secs: u64,
}

/// Sanitized processors config (API keys hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProcessorsConfig {
    pub ai_endpoint: Option<String>,
    pub ai_api_key_configured: bool,
    pub invoice_endpoint: Option<String>,
    pub invoice_api_key_configured: bool,
    pub timeout_secs: u64,
    pub fallback: String,
    pub code_mappings: Option<PathBuf>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: config.storage.clone(),
            extraction: SanitizedExtractionConfig {
                analyzer_endpoint: config.extraction.analyzer_endpoint.clone(),
                analyzer_api_key_configured: config.extraction.analyzer_api_key.is_some(),
                timeout_secs: config.extraction.timeout_secs,
            },
            processors: SanitizedProcessorsConfig {
                ai_endpoint: config.processors.ai_endpoint.clone(),
                ai_api_key_configured: config.processors.ai_api_key.is_some(),
                invoice_endpoint: config.processors.invoice_endpoint.clone(),
                invoice_api_key_configured: config.processors.invoice_api_key.is_some(),
                timeout_secs: config.processors.timeout_secs,
                fallback: config.processors.fallback.as_str().to_string(),
                code_mappings: config.processors.code_mappings.clone(),
            },
            orchestrator: config.orchestrator.clone(),
            log: config.log.clone(),
        }
    }
}
