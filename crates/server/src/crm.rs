//! Zoho CRM adapter.
//!
//! Access tokens come from a refresh-token exchange against the Zoho
//! accounts server and are cached until shortly before expiry. A 401 from
//! the API invalidates the cache and the request is retried once with a
//! fresh token. Provider error payloads are surfaced verbatim through
//! [`CrmServiceError::Provider`] so the sender sees what Zoho said.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use dealbot_core::config::CrmConfig;
use dealbot_core::domain::{AccountRecord, ContactRecord, DealRecord, PendingDeal};
use dealbot_whatsapp::router::{CrmService, CrmServiceError};

const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct ZohoCrm {
    client: Client,
    config: CrmConfig,
    token: Mutex<Option<CachedToken>>,
}

impl ZohoCrm {
    pub fn new(client: Client, config: CrmConfig) -> Self {
        Self { client, config, token: Mutex::new(None) }
    }

    /// Returns a valid access token, refreshing through the accounts server
    /// when the cache is empty or about to expire.
    async fn access_token(&self) -> Result<String, CrmServiceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        let url = format!("{}/oauth/v2/token", self.config.accounts_base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("refresh_token", self.config.refresh_token.expose_secret()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|error| CrmServiceError::Transport(error.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|error| CrmServiceError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(CrmServiceError::Provider(provider_detail(&payload)));
        }

        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CrmServiceError::Provider("token response carried no access_token".to_owned())
            })?
            .to_owned();
        let expires_in = payload.get("expires_in").and_then(Value::as_i64).unwrap_or(3600);

        debug!(event_name = "crm_token_refreshed", expires_in);
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Utc::now()
                + Duration::seconds((expires_in - TOKEN_EXPIRY_SLACK_SECS).max(0)),
        });

        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Sends one API request, retrying once with a fresh token on a 401.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), CrmServiceError> {
        for attempt in 0..2 {
            let token = self.access_token().await?;
            let url = format!("{}/{path}", self.config.api_base_url);
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header("Authorization", format!("Zoho-oauthtoken {token}"));
            if let Some(query) = query {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|error| CrmServiceError::Transport(error.to_string()))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!(event_name = "crm_token_rejected", path, "retrying with a fresh token");
                self.invalidate_token().await;
                continue;
            }

            // 204 means an empty search result; there is no body to parse.
            if status == StatusCode::NO_CONTENT {
                return Ok((status, Value::Null));
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|error| CrmServiceError::Transport(error.to_string()))?;
            return Ok((status, payload));
        }

        Err(CrmServiceError::Provider("token rejected twice in a row".to_owned()))
    }

    async fn insert_record(
        &self,
        module: &str,
        record: Value,
    ) -> Result<String, CrmServiceError> {
        let body = json!({ "data": [record] });
        let (status, payload) =
            self.request(Method::POST, module, None, Some(&body)).await?;

        if !status.is_success() {
            return Err(CrmServiceError::Provider(provider_detail(&payload)));
        }

        let row = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .ok_or_else(|| CrmServiceError::Provider(provider_detail(&payload)))?;

        if row.get("status").and_then(Value::as_str) == Some("error") {
            return Err(CrmServiceError::Provider(row_detail(row)));
        }

        row.get("details")
            .and_then(|details| details.get("id"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                CrmServiceError::Provider("insert response carried no record id".to_owned())
            })
    }

    async fn search_first(
        &self,
        module: &str,
        field: &str,
        query: &str,
        exact: bool,
    ) -> Result<Option<Value>, CrmServiceError> {
        let operator = if exact { "equals" } else { "starts_with" };
        let criteria = format!("({field}:{operator}:{query})");
        let (status, payload) = self
            .request(Method::GET, &format!("{module}/search"), Some(&[("criteria", criteria)]), None)
            .await?;

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CrmServiceError::Provider(provider_detail(&payload)));
        }

        Ok(payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .cloned())
    }
}

#[async_trait]
impl CrmService for ZohoCrm {
    async fn add_contact(
        &self,
        full_name: &str,
        company: &str,
    ) -> Result<ContactRecord, CrmServiceError> {
        let (first_name, last_name) = split_full_name(full_name);
        let mut record = json!({
            "Last_Name": last_name,
            "Account_Name": company,
        });
        if let Some(first_name) = first_name {
            record["First_Name"] = json!(first_name);
        }

        let id = self.insert_record("Contacts", record).await?;
        Ok(ContactRecord {
            id,
            full_name: full_name.to_owned(),
            account_name: Some(company.to_owned()),
        })
    }

    async fn create_deal(&self, deal: &PendingDeal) -> Result<DealRecord, CrmServiceError> {
        let record = json!({
            "Deal_Name": deal.deal_name,
            "Account_Name": deal.account_name,
            "Stage": deal.stage,
            "Pipeline": deal.pipeline,
        });

        let id = self.insert_record("Deals", record).await?;
        Ok(DealRecord {
            id,
            deal_name: deal.deal_name.clone(),
            stage: deal.stage.clone(),
            account_name: Some(deal.account_name.clone()),
        })
    }

    async fn add_note(&self, deal_id: &str, body: &str) -> Result<(), CrmServiceError> {
        let record = json!({
            "Note_Title": "WhatsApp note",
            "Note_Content": body,
            "Parent_Id": deal_id,
            "se_module": "Deals",
        });
        self.insert_record("Notes", record).await.map(|_| ())
    }

    async fn update_deal_stage(
        &self,
        deal_id: &str,
        stage: &str,
    ) -> Result<(), CrmServiceError> {
        let body = json!({ "data": [{ "id": deal_id, "Stage": stage }] });
        let (status, payload) = self.request(Method::PUT, "Deals", None, Some(&body)).await?;

        if !status.is_success() {
            return Err(CrmServiceError::Provider(provider_detail(&payload)));
        }
        if let Some(row) = payload.get("data").and_then(Value::as_array).and_then(|rows| rows.first())
        {
            if row.get("status").and_then(Value::as_str) == Some("error") {
                return Err(CrmServiceError::Provider(row_detail(row)));
            }
        }

        Ok(())
    }

    async fn search_contact(
        &self,
        query: &str,
        exact: bool,
    ) -> Result<Option<ContactRecord>, CrmServiceError> {
        let row = self.search_first("Contacts", "Full_Name", query, exact).await?;
        Ok(row.map(|row| ContactRecord {
            id: record_id(&row),
            full_name: string_field(&row, "Full_Name").unwrap_or_else(|| query.to_owned()),
            account_name: lookup_name(&row, "Account_Name"),
        }))
    }

    async fn search_deal(
        &self,
        query: &str,
        exact: bool,
    ) -> Result<Option<DealRecord>, CrmServiceError> {
        let row = self.search_first("Deals", "Deal_Name", query, exact).await?;
        Ok(row.map(|row| DealRecord {
            id: record_id(&row),
            deal_name: string_field(&row, "Deal_Name").unwrap_or_else(|| query.to_owned()),
            stage: string_field(&row, "Stage").unwrap_or_default(),
            account_name: lookup_name(&row, "Account_Name"),
        }))
    }

    async fn search_account(
        &self,
        query: &str,
    ) -> Result<Option<AccountRecord>, CrmServiceError> {
        let row = self.search_first("Accounts", "Account_Name", query, false).await?;
        Ok(row.map(|row| AccountRecord {
            id: record_id(&row),
            account_name: string_field(&row, "Account_Name").unwrap_or_else(|| query.to_owned()),
            website: string_field(&row, "Website"),
        }))
    }
}

/// Splits on the last whitespace: everything before it is the first name,
/// the final token is the last name. A single token is a bare last name,
/// which is the only mandatory contact field.
fn split_full_name(full_name: &str) -> (Option<String>, String) {
    let trimmed = full_name.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((first, last)) => (Some(first.trim().to_owned()), last.to_owned()),
        None => (None, trimmed.to_owned()),
    }
}

fn record_id(row: &Value) -> String {
    row.get("id").and_then(Value::as_str).unwrap_or_default().to_owned()
}

fn string_field(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_owned)
}

/// Lookup fields come back as `{"name": ..., "id": ...}` objects.
fn lookup_name(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::Object(lookup) => lookup.get("name").and_then(Value::as_str).map(str::to_owned),
        Value::String(name) => Some(name.clone()),
        _ => None,
    }
}

/// Pulls the human-readable message out of a Zoho error payload; falls back
/// to the raw JSON so nothing is swallowed.
fn provider_detail(payload: &Value) -> String {
    let row = payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .unwrap_or(payload);
    row_detail(row)
}

fn row_detail(row: &Value) -> String {
    let code = row.get("code").and_then(Value::as_str);
    let message = row.get("message").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message.to_owned(),
        (Some(code), None) => code.to_owned(),
        (None, None) => row.to_string(),
    }
}
