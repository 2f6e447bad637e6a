//! Remote procedure calls.
//!
//! All writes go through named procedures on the backend, never directly into the tree. A [`Callable`] describes
//! one procedure (its name, its parameters and the shape of its result), a [`CallGateway`] moves the bytes, and
//! [`FunctionCaller`] adds the parameters every call carries.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use treesync::{DecodeError, codec};

use crate::paths::DatabaseLevel;

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("could not encode parameters: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("parameters of {0} are not a map")]
    ParametersNotAMap(&'static str),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("{function} failed with status {status}: {message}")]
    Failed {
        function: String,
        status: u16,
        message: String,
    },
    #[error("unexpected result from {function}: {source}")]
    Decode {
        function: String,
        #[source]
        source: DecodeError,
    },
}

pub trait Callable {
    const NAME: &'static str;
    /// Use [`serde::de::IgnoredAny`] for procedures without a meaningful result.
    type Response: DeserializeOwned;

    fn parameters(&self) -> Result<Map<String, Value>, CallError>;
}

/// Parameters of a callable that serializes to a map.
pub fn parameters_of<T: Serialize>(name: &'static str, value: &T) -> Result<Map<String, Value>, CallError> {
    match serde_json::to_value(value)? {
        Value::Object(parameters) => Ok(parameters),
        _ => Err(CallError::ParametersNotAMap(name)),
    }
}

pub trait CallGateway: Send + Sync {
    /// Runs `function` once and returns its raw result.
    fn call_raw(
        &self,
        function: &str,
        parameters: Map<String, Value>,
    ) -> impl Future<Output = Result<Value, CallError>> + Send;
}

pub struct FunctionCaller<G> {
    gateway: G,
    level: DatabaseLevel,
    private_key: Option<String>,
}

impl<G: CallGateway> FunctionCaller<G> {
    pub fn new(gateway: G, level: DatabaseLevel, private_key: Option<String>) -> Self {
        Self {
            gateway,
            level,
            private_key,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn level(&self) -> DatabaseLevel {
        self.level
    }

    pub async fn call<C: Callable>(&self, callable: &C) -> Result<C::Response, CallError> {
        let mut parameters = callable.parameters()?;
        parameters.insert("clubLevel".into(), Value::from(self.level.as_str()));
        if let Some(private_key) = &self.private_key {
            parameters.insert("privateKey".into(), Value::from(private_key.as_str()));
        }

        log::debug!("Calling {}", C::NAME);
        let result = self
            .gateway
            .call_raw(C::NAME, parameters)
            .await
            .inspect_err(|e| {
                log::error!("Calling {} failed: {e}", C::NAME);
            })?;
        codec::decode(&result).map_err(|source| {
            log::warn!("Unexpected result from {}: {source}", C::NAME);
            CallError::Decode {
                function: C::NAME.to_string(),
                source,
            }
        })
    }
}

#[derive(Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Deserialize)]
struct CallFailure {
    error: FailureBody,
}

#[derive(Deserialize)]
struct FailureBody {
    message: String,
}

/// Calls procedures over HTTP: `POST <base_url>/<function>` with `{"data": parameters}`, answered by
/// `{"result": ...}` or `{"error": {"message": ...}}`.
pub struct HttpCallGateway {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpCallGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn url(&self, function: &str) -> String {
        format!("{}/{function}", self.base_url)
    }
}

impl CallGateway for HttpCallGateway {
    fn call_raw(
        &self,
        function: &str,
        parameters: Map<String, Value>,
    ) -> impl Future<Output = Result<Value, CallError>> + Send {
        let mut request = self
            .client
            .post(self.url(function))
            .json(&json!({ "data": parameters }));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let function = function.to_string();

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| CallError::Transport(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| CallError::Transport(e.to_string()))?;
            if !status.is_success() {
                let message = serde_json::from_str::<CallFailure>(&body)
                    .map(|failure| failure.error.message)
                    .unwrap_or(body);
                return Err(CallError::Failed {
                    function,
                    status: status.as_u16(),
                    message,
                });
            }
            let response: CallResponse =
                serde_json::from_str(&body).map_err(|e| CallError::Decode {
                    function,
                    source: e.into(),
                })?;
            Ok(response.result)
        }
    }
}
