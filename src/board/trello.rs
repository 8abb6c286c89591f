//! Trello board client: REST calls over reqwest.
//!
//! Authenticates with the `key`/`token` query pair Trello expects on every
//! request. Timeouts are enforced by the underlying reqwest client.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use super::{BoardClient, BoardList, Card};
use crate::config::BoardConfig;
use crate::error::BoardError;

/// Card fields requested from the board endpoint.
const CARD_FIELDS: &str = "id,name,due,idList";

/// List fields requested from the board endpoint.
const LIST_FIELDS: &str = "id,name";

/// Trello REST client scoped to one board.
pub struct TrelloClient {
    config: BoardConfig,
    client: reqwest::Client,
}

impl TrelloClient {
    pub fn new(config: BoardConfig) -> Result<Self, BoardError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BoardError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.api_url(path)).query(&[
            ("key", self.config.api_key.expose_secret()),
            ("token", self.config.token.expose_secret()),
        ])
    }

    /// Send a request and fail on transport errors or non-2xx status.
    async fn send(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, BoardError> {
        let resp = request.send().await.map_err(|e| BoardError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(endpoint, status = status.as_u16(), "Board API error response");
            return Err(BoardError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, BoardError> {
        let resp = self.send(endpoint, request).await?;
        resp.json::<T>().await.map_err(|e| BoardError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl BoardClient for TrelloClient {
    async fn list_cards(&self) -> Result<Vec<Card>, BoardError> {
        let path = format!("boards/{}/cards", self.config.board_id);
        let request = self
            .request(Method::GET, &path)
            .query(&[("fields", CARD_FIELDS)]);
        let cards: Vec<Card> = self.fetch_json("list cards", request).await?;
        tracing::debug!(count = cards.len(), board = %self.config.board_id, "Fetched cards");
        Ok(cards)
    }

    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), BoardError> {
        let path = format!("cards/{card_id}");
        let request = self
            .request(Method::PUT, &path)
            .query(&[("idList", list_id)]);
        self.send("move card", request).await?;
        Ok(())
    }

    async fn list_board_lists(&self) -> Result<Vec<BoardList>, BoardError> {
        let path = format!("boards/{}/lists", self.config.board_id);
        let request = self
            .request(Method::GET, &path)
            .query(&[("fields", LIST_FIELDS)]);
        self.fetch_json("list board lists", request).await
    }
}
