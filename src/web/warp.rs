use crate::config::{ROOT, Settings};
use crate::tools::system;
use crate::web::DEFAULT_PORT;
use crate::web::error::ApiError;
use anyhow::Context;
use hyper::{Body, Server};
use serde::Serialize;
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use tower::{Service, ServiceBuilder};
use tracing::{Instrument, Span, debug_span};
use warp::http::header::CONTENT_TYPE;
use warp::http::{HeaderValue, Request, StatusCode};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply, reply};

pub fn with_cloneable<C: Clone + Send>(
    value: C,
) -> impl Filter<Extract = (C,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// Hands the shared settings to a handler.
pub fn with_settings(
    settings: Arc<Settings>,
) -> impl Filter<Extract = (Arc<Settings>,), Error = Infallible> + Clone {
    with_cloneable(settings)
}

pub fn into_response<S: Serialize>(result: anyhow::Result<S>) -> Result<impl Reply, Rejection> {
    into_response_with_status(result.map(|data| (StatusCode::OK, data)))
}

pub fn into_response_with_status<S: Serialize>(
    response: anyhow::Result<(StatusCode, S)>,
) -> Result<impl Reply, Rejection> {
    let (status, data) = response
        .and_then(|(status, data)| {
            let data = serde_json::to_vec(&data).context("Failed to serialize data")?;
            Ok((status, data))
        })
        .map_err(into_rejection)?;

    let mut res = Response::new(data.into());
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(res)
}

pub fn into_rejection(err: anyhow::Error) -> Rejection {
    match err.downcast_ref::<ApiError>() {
        Some(api_error) => api_error.clone().into(),
        None => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)).into(),
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(err) = err.find::<ApiError>() {
        Ok(reply::with_status(reply::json(&err), err.status))
    } else {
        Err(err)
    }
}

#[macro_export]
macro_rules! routes {
    [$route:expr] => {
        $route
    };
    [$route:expr, $($rest:expr),+] => {
        warp::Filter::or($route, routes![$($rest),+])
    };
}

/// Determines where the server listens.
///
/// `BIND_ADDRESS` wins when present. Otherwise the platform assigned `PORT`
/// is bound on all interfaces, falling back to [DEFAULT_PORT].
pub fn bind_address(settings: &Settings) -> anyhow::Result<SocketAddr> {
    let explicit = settings.get_string("BIND_ADDRESS", ROOT);
    if !explicit.is_empty() {
        return SocketAddr::from_str(&explicit)
            .with_context(|| format!("Failed to parse BIND_ADDRESS: {}", explicit));
    }

    let port = match settings.try_int("PORT", ROOT) {
        Some(port) => u16::try_from(port).with_context(|| format!("Invalid PORT: {}", port))?,
        None => DEFAULT_PORT,
    };

    Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
}

/// Serves `routes` until a termination signal arrives.
pub async fn run_webserver<F>(routes: F, settings: &Settings) -> anyhow::Result<()>
where
    F: Filter + Clone + Send + Sync + 'static,
    F::Extract: Reply,
    F::Error: Into<Rejection> + 'static,
{
    let bind_address = bind_address(settings)?;
    tracing::info!("Starting server at {}", bind_address);

    system::install_termination_listener();

    let filter = routes.boxed().recover(handle_rejection);
    let application: Arc<str> = Arc::from(settings.application_name());

    let svc = warp::service(filter);
    let traced_svc = ServiceBuilder::new()
        .layer_fn(|inner| TracingMiddleware {
            inner,
            application: application.clone(),
        })
        .service(svc);

    let server = Server::try_bind(&bind_address)
        .with_context(|| format!("Failed to bind HTTP server to {}", bind_address))?
        .serve(hyper::service::make_service_fn(|_| {
            let svc = traced_svc.clone();
            async move { Ok::<_, Infallible>(svc) }
        }));

    tracing::info!(
        "Running HTTP server at effective address {}",
        server.local_addr()
    );
    server
        .with_graceful_shutdown(system::await_shutdown())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP Server has been stopped...");
    // Lets background tasks spawned by handlers finish before main returns.
    tokio::time::sleep(Duration::from_secs(3)).await;
    tracing::info!("HTTP Server has been terminated.");

    Ok(())
}

#[derive(Clone)]
struct TracingMiddleware<S> {
    inner: S,
    application: Arc<str>,
}

impl<S> Service<Request<Body>> for TracingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        #[cfg_attr(not(feature = "open_telemetry"), allow(unused_mut))]
        let mut span = debug_span!(
            "http_request",
            app = %self.application,
            http.method = %req.method(),
            http.url = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        #[cfg(feature = "open_telemetry")]
        open_telemetry::extract_parent_context(req.headers(), &mut span);

        let mut inner = self.inner.clone();

        let fut = async move {
            let response = inner.call(req).await?;
            Span::current().record("http.status_code", response.status().as_u16() as i64);
            Ok(response)
        }
        .instrument(span);

        Box::pin(fut)
    }
}

#[cfg(feature = "open_telemetry")]
mod open_telemetry {
    use hyper::http::HeaderMap;
    use opentelemetry::propagation::Extractor;
    use tracing::Span;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    struct HeaderExtractor<'a> {
        headers: &'a HeaderMap,
    }

    impl Extractor for HeaderExtractor<'_> {
        fn get(&self, key: &str) -> Option<&str> {
            self.headers.get(key).and_then(|value| value.to_str().ok())
        }

        fn keys(&self) -> Vec<&str> {
            self.headers.keys().map(|header| header.as_str()).collect()
        }
    }

    /// Continues a trace started by the caller (W3C `traceparent`).
    pub fn extract_parent_context(headers: &HeaderMap, span: &mut Span) {
        let extractor = HeaderExtractor { headers };
        let parent_cx =
            opentelemetry::global::get_text_map_propagator(|prop| prop.extract(&extractor));
        span.set_parent(parent_cx);
    }
}
