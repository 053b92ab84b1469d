//! Routing providers used by the live driver.
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use ecomobi_game::{Coord, RouteError, RouteRequest, interpret_response};

/// Something that can answer a [`RouteRequest`] with an ordered path.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn fetch(&self, request: &RouteRequest) -> Result<Vec<Coord>, RouteError>;

    fn label(&self) -> String;
}

/// OSRM-compatible HTTP routing service.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build routing client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RouteProvider for OsrmRouter {
    async fn fetch(&self, request: &RouteRequest) -> Result<Vec<Coord>, RouteError> {
        let url = request.url(&self.base_url);
        log::debug!("routing lookup for level {}: {url}", request.level_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RouteError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| RouteError::Transport(err.to_string()))?;
        interpret_response(status, &body)
    }

    fn label(&self) -> String {
        self.base_url.clone()
    }
}

/// Provider that never reaches the network; every trip uses the straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRouter;

#[async_trait]
impl RouteProvider for OfflineRouter {
    async fn fetch(&self, _request: &RouteRequest) -> Result<Vec<Coord>, RouteError> {
        Err(RouteError::Transport("offline mode".to_string()))
    }

    fn label(&self) -> String {
        "offline".to_string()
    }
}
