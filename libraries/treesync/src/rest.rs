//! Read-only access to a hosted tree over its REST interface, where `GET <base>/<path>.json` returns the node at
//! `path` or `null`.

use std::future::Future;

use serde_json::Value;

use crate::data_model::{Path, TransportError};
use crate::store::RemoteRead;

pub struct RestReader {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl RestReader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    /// Sends `auth=<token>` with every read.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    pub fn url(&self, path: &Path) -> String {
        if path.is_root() {
            format!("{}/.json", self.base_url)
        } else {
            format!("{}/{path}.json", self.base_url)
        }
    }
}

impl RemoteRead for RestReader {
    fn read(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Option<Value>, TransportError>> + Send {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = &self.auth {
            request = request.query(&[("auth", token)]);
        }
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::new(format!("request failed: {e}")))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::new(format!("status {status}: {body}")));
            }
            let value: Value = response
                .json()
                .await
                .map_err(|e| TransportError::new(format!("invalid response body: {e}")))?;
            Ok(Some(value).filter(|value| !value.is_null()))
        }
    }
}
