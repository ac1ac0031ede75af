use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::model::{ActionKind, Entity, EntityId};

pub mod model;

use model::{decode_list, MutationResp};

/// What the backend said about one mutation that reached it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteReply {
    pub succeeded: bool,
    pub message: Option<String>,
}

impl RemoteReply {
    pub fn ok() -> Self {
        Self {
            succeeded: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: Some(message.into()),
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: Some(message.into()),
        }
    }
}

/// Remote capabilities the work-queue core depends on.
///
/// `Err` from `call` means the request never produced an answer (transport
/// failure, non-2xx status, unreadable body); a reachable backend refusing the
/// action answers `Ok` with `succeeded == false`.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn list(&self, kind: &str) -> Result<Vec<Entity>>;

    async fn call(&self, kind: &str, action: ActionKind, id: &EntityId) -> Result<RemoteReply>;
}

/// JSON-over-HTTP admin API.
///
/// Layout under `base_url`: `GET {kind}` lists, `DELETE {kind}/{id}` deletes,
/// and every other action is `POST {kind}/{id}/{action}`.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(base_url: Url, token: Option<String>, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.backend.base_url)
            .with_context(|| format!("invalid backend.base_url {}", cfg.backend.base_url))?;
        Self::new(
            base_url,
            Some(cfg.backend.token.clone()),
            &cfg.backend.user_agent,
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    pub fn build_list_request(&self, kind: &str) -> Result<reqwest::Request> {
        let url = self.endpoint(&[kind])?;
        self.request(Method::GET, url)
            .build()
            .context("failed to build list request")
    }

    pub fn build_action_request(
        &self,
        kind: &str,
        action: ActionKind,
        id: &EntityId,
    ) -> Result<reqwest::Request> {
        let (method, url) = match action {
            ActionKind::Delete => (Method::DELETE, self.endpoint(&[kind, id.as_str()])?),
            other => (
                Method::POST,
                self.endpoint(&[kind, id.as_str(), other.as_str()])?,
            ),
        };
        self.request(method, url)
            .build()
            .context("failed to build action request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<String> {
        debug!(method = %request.method(), url = %request.url(), "sending admin request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach admin backend")?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by admin backend: {}", body);
            return Err(anyhow!("received 429 from admin backend: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "admin backend error: {}", body);
            return Err(anyhow!("admin backend error {}: {}", status, body));
        }
        res.text()
            .await
            .context("failed to read admin backend response")
    }
}

#[async_trait]
impl AdminBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn list(&self, kind: &str) -> Result<Vec<Entity>> {
        let request = self.build_list_request(kind)?;
        let body = self.execute(request).await?;
        let entities = decode_list(&body).with_context(|| format!("invalid {} listing", kind))?;
        debug!(count = entities.len(), "listed entities");
        Ok(entities)
    }

    #[instrument(skip(self, action, id), fields(action = %action, id = %id))]
    async fn call(&self, kind: &str, action: ActionKind, id: &EntityId) -> Result<RemoteReply> {
        let request = self.build_action_request(kind, action, id)?;
        let body = self.execute(request).await?;
        parse_mutation_body(&body)
    }
}

/// An empty 2xx body is a plain success.
pub fn parse_mutation_body(body: &str) -> Result<RemoteReply> {
    if body.trim().is_empty() {
        return Ok(RemoteReply::ok());
    }
    let resp: MutationResp =
        serde_json::from_str(body).context("invalid admin backend mutation response")?;
    Ok(RemoteReply {
        succeeded: resp.success,
        message: resp.message,
    })
}
