//! HTTP implementation of [`DatabasesApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::DatabasesApi;
use crate::error::{ClientError, Result, ServiceErrorBody};
use crate::models::{CreateDatabaseRequest, Database, UpdateDatabaseRequest};

/// Connection settings for the management API.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL of the cluster, e.g. `https://cluster.example.com:9443`.
    pub base_path: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed cluster certificates.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            base_path: "https://localhost:9443".to_string(),
            username: String::new(),
            password: String::new(),
            accept_invalid_certs: false,
            user_agent: concat!("redisent-client/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Management API client over HTTP with basic authentication.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    config: Configuration,
}

impl HttpClient {
    pub fn new(config: Configuration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_path.trim_end_matches('/'), path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.config.username, Some(&self.config.password))
    }

    /// Send a request and return the response if it was successful,
    /// otherwise decode the error body.
    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = self.authed(req).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        debug!("API error response (HTTP {}): {}", status, body);
        Err(decode_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = self.send(req).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Classify an error response body.
///
/// Any JSON object is treated as a structured service error; missing fields
/// default to empty strings. Everything else is unclassified.
fn decode_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => {
            match serde_json::from_value::<ServiceErrorBody>(value) {
                Ok(body) => ClientError::Service { status, body },
                Err(_) => ClientError::Unclassified {
                    status,
                    body: body.to_string(),
                },
            }
        }
        _ => ClientError::Unclassified {
            status,
            body: body.to_string(),
        },
    }
}

#[async_trait]
impl DatabasesApi for HttpClient {
    async fn get_database(&self, uid: u32) -> Result<Database> {
        debug!("GET database {}", uid);
        self.send_json(self.http.get(self.url(&format!("/v1/bdbs/{}", uid))))
            .await
    }

    async fn create_database(&self, req: &CreateDatabaseRequest) -> Result<Database> {
        debug!("POST database {}", req.name);
        self.send_json(self.http.post(self.url("/v1/bdbs")).json(req))
            .await
    }

    async fn update_database(&self, uid: u32, req: &UpdateDatabaseRequest) -> Result<Database> {
        debug!("PUT database {}", uid);
        self.send_json(
            self.http
                .put(self.url(&format!("/v1/bdbs/{}", uid)))
                .json(req),
        )
        .await
    }

    async fn delete_database(&self, uid: u32) -> Result<()> {
        debug!("DELETE database {}", uid);
        self.send(self.http.delete(self.url(&format!("/v1/bdbs/{}", uid))))
            .await?;
        Ok(())
    }
}
