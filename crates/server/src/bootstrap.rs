use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use dealbot_agent::runtime::AssistantRuntime;
use dealbot_core::catalog::Catalogs;
use dealbot_core::config::{AppConfig, ConfigError};
use dealbot_core::session::SessionStore;
use dealbot_whatsapp::outbound::Messenger;
use dealbot_whatsapp::router::DirectiveRouter;

use crate::assistant::{HttpLlmClient, RuntimeAssistant};
use crate::crm::ZohoCrm;
use crate::twilio::TwilioMessenger;

pub struct Application {
    pub config: AppConfig,
    pub router: Arc<DirectiveRouter>,
    pub messenger: Arc<dyn Messenger>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.llm.timeout_secs.max(30)))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let crm = Arc::new(ZohoCrm::new(client.clone(), config.crm.clone()));
    let messenger: Arc<dyn Messenger> =
        Arc::new(TwilioMessenger::new(client.clone(), config.messaging.clone()));

    let llm_client = Arc::new(HttpLlmClient::new(client, config.llm.clone()));
    let assistant = Arc::new(RuntimeAssistant::new(AssistantRuntime::new(llm_client)));

    let sessions = Arc::new(SessionStore::new());
    let catalogs =
        Catalogs::from_entries(config.catalog.stages.clone(), config.catalog.pipelines.clone());

    let router =
        Arc::new(DirectiveRouter::new(crm, assistant, Arc::clone(&sessions), catalogs));

    info!(event_name = "system.bootstrap.ready", "application bootstrap complete");
    Ok(Application { config, router, messenger, sessions })
}

#[cfg(test)]
mod tests {
    use dealbot_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::{bootstrap_with_config, BootstrapError};

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.messaging.account_sid = "ACtest".to_string();
        config.messaging.auth_token = "token-test".to_string().into();
        config.crm.client_id = "1000.CLIENT".to_string();
        config.crm.client_secret = "secret-test".to_string().into();
        config.crm.refresh_token = "refresh-test".to_string().into();
        config
    }

    #[test]
    fn bootstrap_fails_fast_with_an_invalid_account_sid() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                messaging_account_sid: Some("SK-not-an-account-sid".to_string()),
                messaging_auth_token: Some("token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(BootstrapError::from)
        .and_then(bootstrap_with_config);

        let message = match result {
            Ok(_) => panic!("bootstrap should fail validation"),
            Err(error) => error.to_string(),
        };
        assert!(message.contains("messaging.account_sid"));
    }

    #[test]
    fn bootstrap_wires_the_application_from_a_valid_config() {
        let app = match bootstrap_with_config(valid_config()) {
            Ok(app) => app,
            Err(error) => panic!("bootstrap failed: {error}"),
        };

        assert_eq!(app.sessions.pending_count(), 0);
        assert_eq!(app.config.messaging.account_sid, "ACtest");
    }
}
