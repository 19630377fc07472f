//! reqwest-backed [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{Backend, NetworkError};
use crate::models::{ActionPayload, PendingAction, Product, QaItem, Vlog};

/// Talks to the storefront API under `base_url`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            probe_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, NetworkError> {
        let response = request.send().await.map_err(map_reqwest)?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(NetworkError::Status {
                code: status.as_u16(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let response = self.send(self.client.get(self.endpoint(path))).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::Decode(e.to_string()))
    }

    /// Maps a queued action onto the cart / Q&A endpoints.
    fn replay_request(&self, action: &PendingAction) -> RequestBuilder {
        let request = match &action.payload {
            ActionPayload::CartAdd {
                product_id,
                quantity,
                options,
            } => self
                .client
                .post(self.endpoint("/api/cart"))
                .json(&json!({ "productId": product_id, "quantity": quantity, "options": options })),
            ActionPayload::CartUpdate {
                product_id,
                quantity,
            } => self
                .client
                .request(Method::PUT, self.endpoint(&format!("/api/cart/{}", product_id)))
                .json(&json!({ "quantity": quantity })),
            ActionPayload::CartRemove { product_id } => self
                .client
                .delete(self.endpoint(&format!("/api/cart/{}", product_id))),
            ActionPayload::QaSubmit { question, category } => self
                .client
                .post(self.endpoint("/api/qa"))
                .json(&json!({ "question": question, "category": category })),
        };
        request.header("Idempotency-Key", action.id.as_str())
    }
}

fn map_reqwest(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout
    } else if let Some(status) = e.status() {
        NetworkError::Status {
            code: status.as_u16(),
        }
    } else {
        NetworkError::Transport(e.to_string())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn probe(&self) -> Result<(), NetworkError> {
        let request = self
            .client
            .head(self.endpoint("/api/health"))
            .timeout(self.probe_timeout);
        self.send(request).await.map(|_| ())
    }

    async fn fetch_vlogs(&self) -> Result<Vec<Vlog>, NetworkError> {
        self.get_json("/api/vlogs").await
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, NetworkError> {
        self.get_json("/api/products").await
    }

    async fn fetch_qa(&self) -> Result<Vec<QaItem>, NetworkError> {
        self.get_json("/api/qa").await
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self.send(self.client.get(url)).await?;
        let bytes = response.bytes().await.map_err(map_reqwest)?;
        Ok(bytes.to_vec())
    }

    async fn replay(&self, action: &PendingAction) -> Result<(), NetworkError> {
        self.send(self.replay_request(action)).await.map(|_| ())
    }
}
