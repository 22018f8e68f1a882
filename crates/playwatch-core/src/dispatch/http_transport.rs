//! HTTP click transport.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use playwatch_config::{Config, ConfigError};
use playwatch_protocols::{ClickAck, ClickCommand, DispatchError};

use super::transport::ClickTransport;

/// Request body of the click endpoint.
#[derive(Debug, Serialize)]
struct ClickRequest {
    x: u32,
    y: u32,
}

/// Response body of the click endpoint, success or error shaped.
#[derive(Debug, Default, Deserialize)]
struct ClickResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ClickResponse {
    fn reason(self) -> Option<String> {
        self.detail.or(self.error).or(self.message)
    }
}

/// Posts clicks to `{api_base}/api/executions/{id}/click`.
pub struct HttpClickTransport {
    client: Client,
    api_base: Url,
    authorization: Option<String>,
}

impl HttpClickTransport {
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        let api_base = Url::parse(api_base).map_err(|e| ConfigError::InvalidValue {
            field: "server.api_base".to_string(),
            message: e.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "server.api_base".to_string(),
                message: format!("{} cannot be used as a base URL", api_base),
            });
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.api_base".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_base,
            authorization: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut transport = Self::new(&config.server.api_base)?;
        transport.authorization = config.server.authorization.clone();
        Ok(transport)
    }

    /// Send an `Authorization` header with every click.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    fn click_url(&self, execution_id: &str) -> Result<Url, DispatchError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| DispatchError::Network(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .extend(["api", "executions", execution_id, "click"]);
        Ok(url)
    }
}

#[async_trait]
impl ClickTransport for HttpClickTransport {
    async fn send(&self, command: &ClickCommand) -> Result<ClickAck, DispatchError> {
        let url = self.click_url(&command.execution_id)?;
        debug!("POST {} ({}, {})", url, command.native_x, command.native_y);

        let mut req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(ref auth) = self.authorization {
            req = req.header(header::AUTHORIZATION, auth);
        }

        let response = req
            .json(&ClickRequest {
                x: command.native_x,
                y: command.native_y,
            })
            .send()
            .await
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await;

        if !status.is_success() {
            // The status alone still classifies a failure whose body is lost.
            let body = body.unwrap_or_default();
            let parsed: Option<ClickResponse> = serde_json::from_str(&body).ok();
            let reason = parsed
                .and_then(ClickResponse::reason)
                .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
                .unwrap_or_else(|| status.to_string());

            return Err(match status {
                StatusCode::NOT_FOUND | StatusCode::CONFLICT | StatusCode::GONE => {
                    DispatchError::RunNotActive(format!("{}: {}", command.execution_id, reason))
                }
                _ => DispatchError::Rejected {
                    status: Some(status.as_u16()),
                    reason,
                },
            });
        }

        let body = body.map_err(|e| DispatchError::Network(format!("reading response: {}", e)))?;
        let parsed: ClickResponse = serde_json::from_str(&body).unwrap_or_default();
        if parsed.success == Some(false) {
            return Err(DispatchError::Rejected {
                status: Some(status.as_u16()),
                reason: parsed
                    .reason()
                    .unwrap_or_else(|| "click was not accepted".to_string()),
            });
        }

        Ok(ClickAck {
            command_id: command.command_id,
            execution_id: command.execution_id.clone(),
            message: parsed.message,
        })
    }
}
