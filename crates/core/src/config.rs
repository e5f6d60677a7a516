use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{default_pipelines, default_stages};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub messaging: MessagingConfig,
    pub crm: CrmConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

/// Twilio WhatsApp messaging credentials and endpoint.
#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    pub api_base_url: String,
}

/// Zoho CRM OAuth credentials and API endpoints.
#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub accounts_base_url: String,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Dropdown vocabularies. Defaults match the CRM org's picklists; operators
/// with customized picklists override these in the config file.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub stages: Vec<String>,
    pub pipelines: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub messaging_account_sid: Option<String>,
    pub messaging_auth_token: Option<String>,
    pub messaging_from_number: Option<String>,
    pub crm_refresh_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            messaging: MessagingConfig {
                account_sid: String::new(),
                auth_token: String::new().into(),
                from_number: "whatsapp:+14155238886".to_string(),
                api_base_url: "https://api.twilio.com/2010-04-01".to_string(),
            },
            crm: CrmConfig {
                client_id: String::new(),
                client_secret: String::new().into(),
                refresh_token: String::new().into(),
                accounts_base_url: "https://accounts.zoho.com".to_string(),
                api_base_url: "https://www.zohoapis.com/crm/v2".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            catalog: CatalogConfig { stages: default_stages(), pipelines: default_pipelines() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("dealbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(messaging) = patch.messaging {
            if let Some(account_sid) = messaging.account_sid {
                self.messaging.account_sid = account_sid;
            }
            if let Some(auth_token_value) = messaging.auth_token {
                self.messaging.auth_token = secret_value(auth_token_value);
            }
            if let Some(from_number) = messaging.from_number {
                self.messaging.from_number = from_number;
            }
            if let Some(api_base_url) = messaging.api_base_url {
                self.messaging.api_base_url = api_base_url;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(client_id) = crm.client_id {
                self.crm.client_id = client_id;
            }
            if let Some(client_secret_value) = crm.client_secret {
                self.crm.client_secret = secret_value(client_secret_value);
            }
            if let Some(refresh_token_value) = crm.refresh_token {
                self.crm.refresh_token = secret_value(refresh_token_value);
            }
            if let Some(accounts_base_url) = crm.accounts_base_url {
                self.crm.accounts_base_url = accounts_base_url;
            }
            if let Some(api_base_url) = crm.api_base_url {
                self.crm.api_base_url = api_base_url;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(stages) = catalog.stages {
                self.catalog.stages = stages;
            }
            if let Some(pipelines) = catalog.pipelines {
                self.catalog.pipelines = pipelines;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DEALBOT_MESSAGING_ACCOUNT_SID") {
            self.messaging.account_sid = value;
        }
        if let Some(value) = read_env("DEALBOT_MESSAGING_AUTH_TOKEN") {
            self.messaging.auth_token = secret_value(value);
        }
        if let Some(value) = read_env("DEALBOT_MESSAGING_FROM_NUMBER") {
            self.messaging.from_number = value;
        }
        if let Some(value) = read_env("DEALBOT_MESSAGING_API_BASE_URL") {
            self.messaging.api_base_url = value;
        }

        if let Some(value) = read_env("DEALBOT_CRM_CLIENT_ID") {
            self.crm.client_id = value;
        }
        if let Some(value) = read_env("DEALBOT_CRM_CLIENT_SECRET") {
            self.crm.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("DEALBOT_CRM_REFRESH_TOKEN") {
            self.crm.refresh_token = secret_value(value);
        }
        if let Some(value) = read_env("DEALBOT_CRM_ACCOUNTS_BASE_URL") {
            self.crm.accounts_base_url = value;
        }
        if let Some(value) = read_env("DEALBOT_CRM_API_BASE_URL") {
            self.crm.api_base_url = value;
        }

        if let Some(value) = read_env("DEALBOT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("DEALBOT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DEALBOT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("DEALBOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("DEALBOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("DEALBOT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("DEALBOT_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("DEALBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DEALBOT_SERVER_PORT") {
            self.server.port = parse_u16("DEALBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("DEALBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DEALBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("DEALBOT_LOGGING_LEVEL").or_else(|| read_env("DEALBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DEALBOT_LOGGING_FORMAT").or_else(|| read_env("DEALBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(account_sid) = overrides.messaging_account_sid {
            self.messaging.account_sid = account_sid;
        }
        if let Some(auth_token) = overrides.messaging_auth_token {
            self.messaging.auth_token = secret_value(auth_token);
        }
        if let Some(from_number) = overrides.messaging_from_number {
            self.messaging.from_number = from_number;
        }
        if let Some(refresh_token) = overrides.crm_refresh_token {
            self.crm.refresh_token = secret_value(refresh_token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_messaging(&self.messaging)?;
        validate_crm(&self.crm)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_catalog(&self.catalog)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dealbot.toml"), PathBuf::from("config/dealbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_messaging(messaging: &MessagingConfig) -> Result<(), ConfigError> {
    let account_sid = messaging.account_sid.trim();
    if account_sid.is_empty() {
        return Err(ConfigError::Validation(
            "messaging.account_sid is required. Get it from https://console.twilio.com > Account Info".to_string()
        ));
    }
    if !account_sid.starts_with("AC") {
        let hint = if account_sid.starts_with("SK") {
            " (hint: you may have used an API key SID instead of the account SID)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "messaging.account_sid must start with `AC`{hint}. Get it from https://console.twilio.com"
        )));
    }

    if messaging.auth_token.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "messaging.auth_token is required. Get it from https://console.twilio.com > Account Info".to_string()
        ));
    }

    if !messaging.from_number.starts_with("whatsapp:") {
        return Err(ConfigError::Validation(
            "messaging.from_number must use the `whatsapp:+<E.164>` form, e.g. `whatsapp:+14155238886`"
                .to_string(),
        ));
    }

    validate_http_url("messaging.api_base_url", &messaging.api_base_url)
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if crm.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crm.client_id is required. Register a self client at https://api-console.zoho.com"
                .to_string(),
        ));
    }
    if crm.client_secret.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "crm.client_secret is required. Register a self client at https://api-console.zoho.com"
                .to_string(),
        ));
    }
    if crm.refresh_token.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "crm.refresh_token is required. Generate one from your self client's grant token"
                .to_string(),
        ));
    }

    validate_http_url("crm.accounts_base_url", &crm.accounts_base_url)?;
    validate_http_url("crm.api_base_url", &crm.api_base_url)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.stages.iter().all(|entry| entry.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "catalog.stages must contain at least one non-empty entry".to_string(),
        ));
    }
    if catalog.pipelines.iter().all(|entry| entry.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "catalog.pipelines must contain at least one non-empty entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    messaging: Option<MessagingPatch>,
    crm: Option<CrmPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingPatch {
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    accounts_base_url: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    stages: Option<Vec<String>>,
    pipelines: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
