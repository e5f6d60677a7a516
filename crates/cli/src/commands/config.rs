use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dealbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "messaging.account_sid",
        &redact_credential(&config.messaging.account_sid),
        source("messaging.account_sid", "DEALBOT_MESSAGING_ACCOUNT_SID"),
    ));
    lines.push(render_line(
        "messaging.auth_token",
        "<redacted>",
        source("messaging.auth_token", "DEALBOT_MESSAGING_AUTH_TOKEN"),
    ));
    lines.push(render_line(
        "messaging.from_number",
        &config.messaging.from_number,
        source("messaging.from_number", "DEALBOT_MESSAGING_FROM_NUMBER"),
    ));
    lines.push(render_line(
        "messaging.api_base_url",
        &config.messaging.api_base_url,
        source("messaging.api_base_url", "DEALBOT_MESSAGING_API_BASE_URL"),
    ));

    lines.push(render_line(
        "crm.client_id",
        &redact_credential(&config.crm.client_id),
        source("crm.client_id", "DEALBOT_CRM_CLIENT_ID"),
    ));
    lines.push(render_line(
        "crm.client_secret",
        "<redacted>",
        source("crm.client_secret", "DEALBOT_CRM_CLIENT_SECRET"),
    ));
    lines.push(render_line(
        "crm.refresh_token",
        "<redacted>",
        source("crm.refresh_token", "DEALBOT_CRM_REFRESH_TOKEN"),
    ));
    lines.push(render_line(
        "crm.accounts_base_url",
        &config.crm.accounts_base_url,
        source("crm.accounts_base_url", "DEALBOT_CRM_ACCOUNTS_BASE_URL"),
    ));
    lines.push(render_line(
        "crm.api_base_url",
        &config.crm.api_base_url,
        source("crm.api_base_url", "DEALBOT_CRM_API_BASE_URL"),
    ));

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", "DEALBOT_LLM_PROVIDER"),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", "DEALBOT_LLM_MODEL"),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        source("llm.base_url", "DEALBOT_LLM_BASE_URL"),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line("llm.api_key", llm_api_key, source("llm.api_key", "DEALBOT_LLM_API_KEY")));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "DEALBOT_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "DEALBOT_SERVER_PORT"),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", "DEALBOT_SERVER_HEALTH_CHECK_PORT"),
    ));

    lines.push(render_line(
        "catalog.stages",
        &config.catalog.stages.join(", "),
        source("catalog.stages", ""),
    ));
    lines.push(render_line(
        "catalog.pipelines",
        &config.catalog.pipelines.join(", "),
        source("catalog.pipelines", ""),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "DEALBOT_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "DEALBOT_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("dealbot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/dealbot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if !env_key.is_empty() && env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps enough of the credential to recognize it, never the whole thing.
fn redact_credential(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() <= 4 {
        return "***".to_string();
    }
    format!("{}***", &trimmed[..4])
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_credential};

    #[test]
    fn redaction_keeps_only_a_short_prefix() {
        assert_eq!(redact_credential("AC1234567890"), "AC12***");
        assert_eq!(redact_credential("abc"), "***");
        assert_eq!(redact_credential(""), "<empty>");
    }

    #[test]
    fn nested_toml_paths_resolve() {
        let doc: toml::Value = r#"
[messaging]
from_number = "whatsapp:+15551110000"
"#
        .parse()
        .expect("parse");

        assert!(contains_path(&doc, "messaging.from_number"));
        assert!(!contains_path(&doc, "messaging.account_sid"));
    }
}
