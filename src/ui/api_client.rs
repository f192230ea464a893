use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use thiserror::Error;

use crate::api::{ACTION_LOAD, fields};

/// Decoded response envelope as the front end sees it. Fields are lenient
/// so a malformed payload degrades to an unsuccessful reply.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub clientes: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ClientApi: Send + Sync {
    async fn load(&self) -> Result<ApiReply, TransportError>;

    async fn save(&self, form: &[(String, String)]) -> Result<ApiReply, TransportError>;
}

/// `ClientApi` over HTTP.
pub struct HttpClientApi {
    client: reqwest::Client,
    url: String,
}

impl HttpClientApi {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

async fn decode(response: reqwest::Response) -> Result<ApiReply, TransportError> {
    // Error statuses still carry an envelope, so the body is read regardless.
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| TransportError::Decode(err.to_string()))
}

#[async_trait]
impl ClientApi for HttpClientApi {
    async fn load(&self) -> Result<ApiReply, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[(fields::ACTION, ACTION_LOAD)])
            .send()
            .await?;
        decode(response).await
    }

    async fn save(&self, form: &[(String, String)]) -> Result<ApiReply, TransportError> {
        let body = form
            .iter()
            .fold(Form::new(), |body, (name, value)| body.text(name.clone(), value.clone()));
        let response = self.client.post(&self.url).multipart(body).send().await?;
        decode(response).await
    }
}
