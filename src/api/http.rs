use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::state::{Bid, Session};

use super::BetProvider;

/// JSON body of a bid submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BidRequest {
    ticket_id: u32,
    amount: Decimal,
}

/// Error body shape the provider uses for rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Reference `BetProvider` over the provider's REST surface.
pub struct HttpProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map a non-success response to `Rejected`, preferring the provider's
    /// own message field over the bare status code.
    async fn rejection(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let message = match response.text().await {
            Ok(body) => match serde_json::from_str::<ErrorBody>(&body) {
                Ok(ErrorBody {
                    message: Some(message),
                }) => message,
                _ if !body.is_empty() => body,
                _ => status.to_string(),
            },
            Err(_) => status.to_string(),
        };
        debug!(%status, %message, "provider rejected request");
        ProviderError::Rejected(message)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        response.json::<T>().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable(err.to_string())
}

#[async_trait]
impl BetProvider for HttpProvider {
    async fn start_session(
        &self,
        session_id: &str,
        duration_minutes: u32,
        task_interval_seconds: u32,
    ) -> Result<Session, ProviderError> {
        let response = self
            .client
            .post(self.url("session/start"))
            .query(&[
                ("sessionId", session_id),
                ("durationMinutes", &duration_minutes.to_string()),
                ("taskIntervalSeconds", &task_interval_seconds.to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn session_status(&self, session_id: &str) -> Result<Session, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("session/status/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn stop_session(&self, session_id: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.url(&format!("session/stop/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }

    async fn submit_bid(
        &self,
        session_id: &str,
        participant_id: u32,
        amount: Decimal,
    ) -> Result<Bid, ProviderError> {
        let body = BidRequest {
            ticket_id: participant_id,
            amount,
        };
        let response = self
            .client
            .post(self.url(&format!("place/{session_id}")))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn list_bids(&self, session_id: &str) -> Result<Vec<Bid>, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("all/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn highest_bid(&self, session_id: &str) -> Result<Bid, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("highest/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        // An empty session answers 200 with a null body.
        let bid: Option<Bid> = Self::read_json(response).await?;
        bid.ok_or(ProviderError::NoBids)
    }

    async fn lowest_bid(&self, session_id: &str) -> Result<Bid, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("lowest/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        let bid: Option<Bid> = Self::read_json(response).await?;
        bid.ok_or(ProviderError::NoBids)
    }
}
