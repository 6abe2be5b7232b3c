//! OpenSearch client configured from the environment.
//!
//! ```text
//! cfkit_opensearch={
//!   "urls": ["http://search.internal:9200"],
//!   "user": "reader",
//!   "password": "...",
//!   "healthcheck": {"enable": true},
//!   "name": "search"
//! }
//! ```
//!
//! When `name` is set, the bound service supplies missing values through its
//! `uri`, `username` and `password` credentials.

use crate::config::{EnvRecord, RecordBinder, Settings};
use anyhow::Context;
use opensearch::OpenSearch;
use opensearch::auth::Credentials;
use opensearch::http::Url;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use std::fmt::{Debug, Formatter};

#[derive(Default)]
pub struct OpenSearchEnv {
    pub urls: Vec<String>,
    pub user: String,
    pub password: String,
    pub healthcheck: bool,
    pub name: String,
}

impl Debug for OpenSearchEnv {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchEnv")
            .field("urls", &self.urls)
            .field("user", &self.user)
            .field("healthcheck", &self.healthcheck)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EnvRecord for OpenSearchEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder
            .strings("cfkit_opensearch.urls", |env, urls| env.urls = urls)
            .string("cfkit_opensearch.user", |env, user| env.user = user)
            .string("cfkit_opensearch.password", |env, password| {
                env.password = password
            })
            .bool("cfkit_opensearch.healthcheck.enable", |env, enable| {
                env.healthcheck = enable
            })
            .string("cfkit_opensearch.name", |env, name| env.name = name);
    }
}

impl OpenSearchEnv {
    /// Fills the gaps of the explicit configuration from the bound service.
    fn complete_from_service(&mut self, settings: &Settings) -> anyhow::Result<()> {
        if self.name.is_empty() {
            return Ok(());
        }

        let service = settings.require_service(&[self.name.as_str()])?;
        if self.urls.is_empty() {
            self.urls = vec![service.require_credential("uri")?];
        }
        if self.user.is_empty() {
            self.user = service.credential_string("username").unwrap_or_default();
            self.password = service.credential_string("password").unwrap_or_default();
        }

        Ok(())
    }

    fn url(&self) -> anyhow::Result<Url> {
        let url = self
            .urls
            .iter()
            .find(|url| !url.is_empty())
            .context("No OpenSearch url present in cfkit_opensearch.urls")?;
        if self.urls.len() > 1 {
            tracing::warn!("Multiple OpenSearch urls given, only {} is used", url);
        }

        Url::parse(url).with_context(|| format!("Invalid OpenSearch url: {}", url))
    }
}

pub struct OpenSearchClient {
    pub client: OpenSearch,
}

impl OpenSearchClient {
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut env: OpenSearchEnv = settings.parse()?;
        env.complete_from_service(settings)?;
        tracing::debug!("OpenSearch env: {:?}", env);

        let client = Self::connect(&env)?;
        if env.healthcheck {
            client.ping().await?;
        }

        Ok(client)
    }

    fn connect(env: &OpenSearchEnv) -> anyhow::Result<Self> {
        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(env.url()?));
        if !env.user.is_empty() {
            builder = builder.auth(Credentials::Basic(env.user.clone(), env.password.clone()));
        }

        let transport = builder
            .build()
            .context("Failed to build OpenSearch transport")?;
        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    #[tracing::instrument(level = "debug", skip(self), err(Display))]
    pub async fn ping(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .context("OpenSearch is unreachable")?;

        if !response.status_code().is_success() {
            anyhow::bail!("OpenSearch ping failed: {}", response.status_code());
        }

        Ok(())
    }
}
