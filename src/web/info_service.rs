//! Application info endpoint.
//!
//! Exposes `/info/v1` with the application metadata the platform publishes
//! in `VCAP_APPLICATION`. Useful for health checks and deployment
//! verification.

use crate::config::Settings;
use crate::config::settings::APPLICATION_VARIABLE;
use crate::web::warp::with_settings;
use serde_json::json;
use std::sync::Arc;
use warp::Filter;
use warp::filters::BoxedFilter;

pub fn get_info_route(settings: Arc<Settings>) -> BoxedFilter<(impl warp::Reply,)> {
    warp::path!("info" / "v1")
        .and(warp::get())
        .and(with_settings(settings))
        .and_then(handle_get_info)
        .boxed()
}

#[tracing::instrument(level = "debug", name = "GET /info/v1", skip_all)]
async fn handle_get_info(settings: Arc<Settings>) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&info(&settings)))
}

fn info(settings: &Settings) -> serde_json::Value {
    json!({
        "app": settings.application_name(),
        "version": settings.get_string(APPLICATION_VARIABLE, &["application_version"]),
        "instanceIndex": settings.try_int(APPLICATION_VARIABLE, &["instance_index"]),
        "space": settings.get_string(APPLICATION_VARIABLE, &["space_name"]),
        "cfkit": env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticEnvironment;

    #[tokio::test]
    async fn serves_application_metadata() {
        let settings = Arc::new(Settings::with_source(StaticEnvironment::new().with(
            APPLICATION_VARIABLE,
            r#"{"application_name": "orders", "application_version": "4f2c",
                "instance_index": 2, "space_name": "staging"}"#,
        )));

        let res = warp::test::request()
            .path("/info/v1")
            .reply(&get_info_route(settings))
            .await;

        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["app"], "orders");
        assert_eq!(body["version"], "4f2c");
        assert_eq!(body["instanceIndex"], 2);
        assert_eq!(body["space"], "staging");
    }

    #[test]
    fn tolerates_missing_platform_data() {
        let body = info(&Settings::with_source(StaticEnvironment::new()));
        assert_eq!(body["app"], "");
        assert!(body["instanceIndex"].is_null());
    }
}
