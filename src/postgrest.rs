use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::constants::{API_KEY_HEADER, REST_PATH_PREFIX};
use crate::error::{PmsError, Result};
use crate::remote::{Filter, RemoteTable, TableQuery};

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
        .collect()
}

/// Prefers the `message` field of a JSON error body, falling back to the raw text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => format!("Request failed with status {}", status),
        None => body.to_string(),
    }
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PmsError::Remote(error_message(&body, status)))
}

/// REST table client for a hosted PostgREST endpoint.
///
/// Requests are authorized with the signed-in user's access token when there is one,
/// otherwise with the project key.
pub struct PostgrestClient {
    http: Client,
    base_url: String,
    api_key: String,
    identity: Arc<dyn IdentityProvider>,
}

impl PostgrestClient {
    pub fn new(config: &ClientConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_client(Client::new(), config, identity)
    }

    pub fn with_client(
        http: Client,
        config: &ClientConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
            identity,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PATH_PREFIX, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .identity
            .current_session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.api_key.clone());
        request
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(token)
    }
}

#[async_trait]
impl RemoteTable for PostgrestClient {
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(&query.filters));
        if let Some(order) = &query.order {
            params.push(("order".to_string(), order.to_param()));
        }

        tracing::debug!(table, "select");
        let response = self
            .authorized(self.http.get(self.table_url(table)))
            .query(&params)
            .send()
            .await?;
        let rows = check_response(response).await?.json::<Vec<Value>>().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        tracing::debug!(table, "insert");
        let response = self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> Result<()> {
        tracing::debug!(table, "update");
        let response = self
            .authorized(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .query(&filter_params(filters))
            .json(&fields)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        tracing::debug!(table, "delete");
        let response = self
            .authorized(self.http.delete(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .query(&filter_params(filters))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }
}
