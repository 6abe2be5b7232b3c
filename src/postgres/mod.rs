//! Postgres connection pool bound to a platform service.
//!
//! ```text
//! cfkit_postgres={
//!   "name": "orders-db",
//!   "connection": {"max_open": 16, "max_idle": 2},
//!   "orm": {"show_sql": false}
//! }
//! ```
//!
//! The connection URI is the `uri` credential of the service named by `name`,
//! or of the first service labelled `postgres`.

use crate::config::{EnvRecord, RecordBinder, Settings};
use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Executor};
use std::str::FromStr;
use url::Url;

#[derive(Debug, Default)]
pub struct PostgresEnv {
    pub name: String,
    pub max_open: i64,
    pub max_idle: i64,
    pub show_sql: bool,
}

impl EnvRecord for PostgresEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder
            .string("cfkit_postgres.name", |env, name| env.name = name)
            .int("cfkit_postgres.connection.max_open", |env, max_open| {
                env.max_open = max_open
            })
            .int("cfkit_postgres.connection.max_idle", |env, max_idle| {
                env.max_idle = max_idle
            })
            .bool("cfkit_postgres.orm.show_sql", |env, show_sql| {
                env.show_sql = show_sql
            });
    }
}

impl PostgresEnv {
    /// Zero or negative limits keep the pool defaults.
    fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new();
        if let Ok(max_open) = u32::try_from(self.max_open)
            && max_open > 0
        {
            options = options.max_connections(max_open);
        }
        if let Ok(max_idle) = u32::try_from(self.max_idle)
            && max_idle > 0
        {
            // Idle connections are kept warm up to the pool limit.
            let limit = options.get_max_connections();
            options = options.min_connections(max_idle.min(limit));
        }

        options
    }
}

const INVALID_URI: &str = "<invalid postgres uri>";

/// Replaces the password of `uri` so that it can be logged.
pub fn masked_url(uri: &str) -> String {
    let Ok(mut url) = Url::parse(uri) else {
        return INVALID_URI.to_owned();
    };
    if url.password().is_some() && url.set_password(Some("***")).is_err() {
        return INVALID_URI.to_owned();
    }

    url.to_string()
}

#[derive(Clone, Debug)]
pub struct Postgres {
    pool: PgPool,
}

impl Postgres {
    /// Builds the pool. Connections are opened on first use.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Postgres> {
        let env: PostgresEnv = settings.parse()?;
        tracing::debug!("Postgres env: {:?}", env);

        let uri = settings.postgres_uri(&[env.name.as_str()])?;
        tracing::info!("Postgres init DB uri: {}", masked_url(&uri));

        let mut connect_options = PgConnectOptions::from_str(&uri)
            .with_context(|| format!("Invalid postgres uri: {}", masked_url(&uri)))?;
        if !env.show_sql {
            connect_options = connect_options.disable_statement_logging();
        }

        Ok(Postgres {
            pool: env.pool_options().connect_lazy_with(connect_options),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[tracing::instrument(level = "debug", skip(self), err(Display))]
    pub async fn version(&self) -> anyhow::Result<String> {
        let row: (String,) = sqlx::query_as("select version()")
            .fetch_one(&self.pool)
            .await
            .context("Failed to query postgres version")?;

        Ok(row.0)
    }

    /// Whether the database answers queries.
    pub async fn status(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                tracing::debug!("Postgres version: {}", version);
                true
            }
            Err(err) => {
                tracing::error!("Postgres status check failed: {:#}", err);
                false
            }
        }
    }

    /// Runs `statement` without parameters, e.g. for schema setup.
    pub async fn execute(&self, statement: &str) -> anyhow::Result<u64> {
        let result = self
            .pool
            .execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", statement))?;

        Ok(result.rows_affected())
    }
}
