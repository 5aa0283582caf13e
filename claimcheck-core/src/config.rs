use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ClaimcheckError;
use crate::llm::LlmConfig;
use crate::search::SearchConfig;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClaimcheckConfig {
    pub service: ServiceConfig,
    pub llm: LlmSection,
    pub search: SearchSection,
    pub extraction: ExtractionConfig,
    pub verification: VerificationConfig,
    pub timeouts: TimeoutConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
    /// Deployment secrets file holding the upstream API keys.
    pub secrets_file: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            secrets_file: "secrets.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: crate::llm::OPENAI_BASE_URL.to_string(),
            temperature: crate::llm::DEFAULT_TEMPERATURE,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchSection {
    pub base_url: String,
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            base_url: crate::search::TAVILY_BASE_URL.to_string(),
            max_results: crate::search::DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_chars: crate::extractor::DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    /// Claims verified at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutConfig {
    pub extraction_seconds: u64,
    pub verification_seconds: u64,
    pub http_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            extraction_seconds: 60,
            verification_seconds: 60,
            http_seconds: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_seconds)
    }

    pub fn verification(&self) -> Duration {
        Duration::from_secs(self.verification_seconds)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8780,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ClaimcheckConfig {
    /// Layer defaults, a TOML file, and `CLAIMCHECK__SECTION__KEY` env vars.
    ///
    /// With `path == None` an optional `claimcheck.toml` in the working
    /// directory is used; an explicit path must exist.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name("claimcheck").required(false),
        };
        let s = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("CLAIMCHECK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn llm_config(&self, credentials: &Credentials) -> LlmConfig {
        LlmConfig {
            api_key: credentials.openai_api_key.clone(),
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            max_retries: self.llm.max_retries,
            retry_delay_ms: self.llm.retry_delay_ms,
            request_timeout: self.timeouts.http(),
        }
    }

    pub fn search_config(&self, credentials: &Credentials) -> SearchConfig {
        SearchConfig {
            api_key: credentials.tavily_api_key.clone(),
            base_url: self.search.base_url.clone(),
            request_timeout: self.timeouts.http(),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Keys as read from the deployment secrets file. Either spelling is accepted.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SecretsFile {
    #[serde(default, alias = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,
    #[serde(default, alias = "TAVILY_API_KEY")]
    pub tavily_api_key: Option<String>,
}

impl SecretsFile {
    /// Read the secrets file; a missing file yields no secrets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

/// API keys for both upstream services. Constructed once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub tavily_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("tavily_api_key", &"<redacted>")
            .finish()
    }
}

fn usable_key(key: &str) -> bool {
    let trimmed = key.trim();
    !trimmed.is_empty() && !trimmed.contains("...")
}

impl Credentials {
    /// Secrets file first, then the process environment.
    pub fn resolve(config: &ClaimcheckConfig) -> Result<Self, ClaimcheckError> {
        let secrets = SecretsFile::load(Path::new(&config.service.secrets_file))?;
        Self::resolve_with(secrets, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        secrets: SecretsFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClaimcheckError> {
        let pick = |from_secrets: Option<String>, name: &'static str| {
            from_secrets
                .filter(|k| usable_key(k))
                .or_else(|| env(name).filter(|k| usable_key(k)))
                .map(|k| k.trim().to_string())
                .ok_or(ClaimcheckError::MissingCredential(name))
        };

        Ok(Self {
            openai_api_key: pick(secrets.openai_api_key, OPENAI_API_KEY)?,
            tavily_api_key: pick(secrets.tavily_api_key, TAVILY_API_KEY)?,
        })
    }
}
