// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP index client for Elasticsearch-compatible search engines.
//!
//! Documents are upserted with `PUT {base_url}/{index}/_doc/{id}`, which is
//! insert-or-replace keyed by document id. Transport failures surface as
//! [`IndexError::Backend`], non-2xx responses as [`IndexError::Rejected`];
//! the worker retries both.

use std::time::Duration;
use tracing::info;

use super::{IndexClient, IndexError, TaskDocument};
use async_trait::async_trait;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpIndexClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl HttpIndexClient {
    /// Create a client without probing the engine.
    pub fn new(
        base_url: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IndexError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    /// Create a client and verify the engine is reachable.
    pub async fn connect(
        base_url: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self, IndexError> {
        let client = Self::new(base_url, index)?;
        client.ping().await?;
        info!(url = %client.base_url, index = %client.index, "connected to search index");
        Ok(client)
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| IndexError::Backend(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(IndexError::Backend(format!(
                "search index returned {} on ping",
                response.status()
            )))
        }
    }

    fn doc_url(&self, id: i64) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, id)
    }
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn upsert(&self, id: i64, doc: &TaskDocument) -> Result<(), IndexError> {
        let response = self
            .client
            .put(self.doc_url(id))
            .json(doc)
            .send()
            .await
            .map_err(|e| IndexError::Backend(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(IndexError::Rejected {
            id,
            reason: format!("{}: {}", status, body),
        })
    }
}
