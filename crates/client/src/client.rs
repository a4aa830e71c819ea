//! REST client for the project-management backend.
//!
//! Every request carries the `X-User-Id` header. Non-success responses are
//! mapped onto [`AppError`] with the server's `detail` preserved verbatim.

#![allow(missing_docs)]

use std::time::Duration;

use masterplan_common::{ApiConfig, AppError, AppResult};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Header identifying the acting user.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// HTTP client bound to one backend base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    user_id: String,
}

impl ApiClient {
    /// Build a client from the `[api]` configuration section.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("masterplan/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        // `Url::join` drops the last path segment unless it ends with '/'.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            user_id: config.user_id.clone(),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("Invalid endpoint '{path}': {e}")))
    }

    pub(crate) fn get(&self, path: &str) -> AppResult<RequestBuilder> {
        Ok(self.client.get(self.endpoint(path)?))
    }

    pub(crate) fn post(&self, path: &str) -> AppResult<RequestBuilder> {
        Ok(self.client.post(self.endpoint(path)?))
    }

    pub(crate) fn patch(&self, path: &str) -> AppResult<RequestBuilder> {
        Ok(self.client.patch(self.endpoint(path)?))
    }

    pub(crate) fn delete(&self, path: &str) -> AppResult<RequestBuilder> {
        Ok(self.client.delete(self.endpoint(path)?))
    }

    /// Send `request` and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Serialization(format!("Invalid response body: {e}")))
    }

    /// Send `request` and discard the body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> AppResult<()> {
        self.execute(request).await.map(drop)
    }

    async fn execute(&self, request: RequestBuilder) -> AppResult<Response> {
        let request = request
            .header(USER_ID_HEADER, &self.user_id)
            .header(ACCEPT, "application/json")
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build request: {e}")))?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, %url, "Sending request");
        let response = self.client.execute(request).await.map_err(|e| {
            warn!(%method, %url, error = %e, "Request failed");
            AppError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(status, &body);
        warn!(%method, %url, status = status.as_u16(), detail = %detail, "Request rejected");
        Err(rejection(status, detail))
    }
}

/// Map a non-success status onto an error kind.
fn rejection(status: StatusCode, detail: String) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        s if s.is_client_error() => AppError::Conflict(detail),
        s => AppError::ExternalService {
            status: s.as_u16(),
            detail,
        },
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Items(Vec<DetailItem>),
    Other(Value),
}

/// One entry of a request-validation error list.
#[derive(Deserialize)]
struct DetailItem {
    #[serde(default)]
    loc: Vec<Value>,
    msg: String,
}

impl DetailItem {
    fn render(&self) -> String {
        // The first element names the request part ("body", "query").
        let field = self
            .loc
            .iter()
            .skip(1)
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        if field.is_empty() {
            self.msg.clone()
        } else {
            format!("{field}: {}", self.msg)
        }
    }
}

/// Extract the message to show for a rejected request.
fn error_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Detail::Message(message),
        }) => message,
        Ok(ErrorBody {
            detail: Detail::Items(items),
        }) => items
            .iter()
            .map(DetailItem::render)
            .collect::<Vec<_>>()
            .join("; "),
        Ok(ErrorBody {
            detail: Detail::Other(value),
        }) => value.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("error")
        ),
    }
}
