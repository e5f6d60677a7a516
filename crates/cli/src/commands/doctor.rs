use dealbot_core::config::{AppConfig, LlmProvider, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"error\": \"{}\"}}", escape_json(&error.to_string())))
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            None
        }
    };

    checks.push(match &config {
        Some(config) => messaging_check(config),
        None => skipped("messaging_credentials"),
    });
    checks.push(match &config {
        Some(config) => crm_check(config),
        None => skipped("crm_credentials"),
    });
    checks.push(match &config {
        Some(config) => llm_check(config),
        None => skipped("llm_readiness"),
    });
    checks.push(match &config {
        Some(config) => catalog_check(config),
        None => skipped("dropdown_catalogs"),
    });

    let failed = checks.iter().filter(|check| check.status == CheckStatus::Fail).count();
    let passed = checks.iter().filter(|check| check.status == CheckStatus::Pass).count();
    let overall_status = if failed == 0 { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if failed == 0 {
        format!("{passed} checks passed")
    } else {
        format!("{failed} of {} checks failed", checks.len())
    };

    DoctorReport { overall_status, summary, checks }
}

fn messaging_check(config: &AppConfig) -> DoctorCheck {
    let messaging = &config.messaging;
    if !messaging.account_sid.starts_with("AC") {
        return fail(
            "messaging_credentials",
            "account SID does not start with AC; API keys (SK...) cannot send messages",
        );
    }
    if messaging.auth_token.expose_secret().trim().is_empty() {
        return fail("messaging_credentials", "auth token is empty");
    }
    DoctorCheck {
        name: "messaging_credentials",
        status: CheckStatus::Pass,
        details: format!("account SID and auth token present, sending as {}", messaging.from_number),
    }
}

fn crm_check(config: &AppConfig) -> DoctorCheck {
    let crm = &config.crm;
    if crm.client_id.trim().is_empty() || crm.client_secret.expose_secret().trim().is_empty() {
        return fail("crm_credentials", "OAuth client id or secret is empty");
    }
    if crm.refresh_token.expose_secret().trim().is_empty() {
        return fail("crm_credentials", "refresh token is empty; mint one at api-console.zoho.com");
    }
    DoctorCheck {
        name: "crm_credentials",
        status: CheckStatus::Pass,
        details: format!("OAuth credentials present, token endpoint {}", crm.accounts_base_url),
    }
}

fn llm_check(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    match llm.provider {
        LlmProvider::Ollama => {
            if llm.base_url.is_none() {
                return fail("llm_readiness", "ollama provider requires llm.base_url");
            }
        }
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            if llm.api_key.is_none() {
                return fail("llm_readiness", "hosted provider requires llm.api_key");
            }
        }
    }
    DoctorCheck {
        name: "llm_readiness",
        status: CheckStatus::Pass,
        details: format!("provider {:?} with model {}", llm.provider, llm.model),
    }
}

fn catalog_check(config: &AppConfig) -> DoctorCheck {
    let catalog = &config.catalog;
    if catalog.stages.is_empty() || catalog.pipelines.is_empty() {
        return fail("dropdown_catalogs", "stage or pipeline catalog is empty");
    }
    DoctorCheck {
        name: "dropdown_catalogs",
        status: CheckStatus::Pass,
        details: format!(
            "{} stages, {} pipelines",
            catalog.stages.len(),
            catalog.pipelines.len()
        ),
    }
}

fn fail(name: &'static str, details: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Fail, details: details.to_string() }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because config validation failed".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![format!("dealbot doctor: {}", report.summary)];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}

fn escape_json(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_checks_explain_themselves() {
        let check = skipped("crm_credentials");
        assert_eq!(check.status, CheckStatus::Skipped);
        assert!(check.details.contains("config validation"));
    }

    #[test]
    fn human_rendering_marks_failures_loudly() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "1 of 2 checks failed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "configuration loaded and validated".to_string(),
                },
                fail("messaging_credentials", "auth token is empty"),
            ],
        };

        let rendered = render_human(&report);
        assert!(rendered.contains("[ok] config_validation"));
        assert!(rendered.contains("[FAIL] messaging_credentials: auth token is empty"));
    }

    #[test]
    fn json_status_uses_snake_case() {
        let status = serde_json::to_string(&CheckStatus::Pass).expect("serialize");
        assert_eq!(status, "\"pass\"");
    }
}
