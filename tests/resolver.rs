use cfkit::config::{
    ConfigError, EnvRecord, ROOT, RecordBinder, Settings, StaticEnvironment, enable_caching,
};
use rand::seq::SliceRandom;
use serial_test::serial;

const SERVICES: &str = r#"{
    "postgres": [
        {"name": "mydb", "label": "postgres", "tags": ["sql"],
         "credentials": {"uri": "postgres://h/db"}}
    ],
    "generic-a": [
        {"name": "queue", "label": "generic-a", "credentials": {"uri": "amqp://q"}}
    ],
    "generic-b": [
        {"name": "cache", "label": "generic-b", "credentials": {"uri": "redis://c"}}
    ]
}"#;

fn settings(vars: &[(&str, &str)]) -> Settings {
    Settings::with_source(vars.iter().copied().collect::<StaticEnvironment>())
}

#[test]
fn reads_nested_integers() {
    let settings = settings(&[("CFG", r#"{"a": {"b": [10, 20, 30]}}"#)]);
    assert_eq!(settings.get_int("CFG", &["a", "b", "1"]), 20);
}

#[test]
fn keeps_non_json_values_as_strings() {
    let settings = settings(&[("FLAG", "yes")]);

    assert!(!settings.get_bool("FLAG", ROOT));
    assert_eq!(settings.get_string("FLAG", ROOT), "yes");
}

#[test]
fn missing_variables_yield_defaults() {
    let settings = settings(&[]);

    assert_eq!(settings.get_string("MISSING", &["x", "y"]), "");
    assert_eq!(settings.get_int("MISSING", &["x", "y"]), 0);
    assert!(!settings.get_bool("MISSING", &["x", "y"]));
    assert!(settings.get_strings("MISSING", ROOT).is_empty());
    assert_eq!(settings.try_string("MISSING", &["x"]), None);
}

#[test]
fn falls_back_from_name_to_label() {
    let settings = settings(&[("VCAP_SERVICES", SERVICES)]);

    let service = settings.resolve_service(&["other", "postgres"]).unwrap();
    assert_eq!(service.name, "mydb");
    assert_eq!(
        settings.service_uri(&["other", "postgres"]).unwrap(),
        "postgres://h/db"
    );
}

#[test]
#[serial]
fn stops_at_the_first_resolvable_candidate() {
    enable_caching();
    let settings = settings(&[("VCAP_SERVICES", SERVICES)]);

    let service = settings
        .resolve_service(&["specific", "generic-a", "generic-b"])
        .unwrap();

    assert_eq!(service.name, "queue");
    let keys = settings.cached_keys();
    assert!(keys.contains(&"service_specific".to_owned()));
    assert!(keys.contains(&"service_generic-a".to_owned()));
    assert!(!keys.contains(&"service_generic-b".to_owned()));
}

#[test]
fn candidate_order_decides_regardless_of_catalog_order() {
    let settings = settings(&[("VCAP_SERVICES", SERVICES)]);
    let mut rng = rand::rng();

    for _ in 0..10 {
        let mut others = vec!["missing", "", "also-missing"];
        others.shuffle(&mut rng);

        let mut candidates = others;
        candidates.push("generic-b");
        candidates.push("generic-a");

        let service = settings.resolve_service(candidates.as_slice()).unwrap();
        assert_eq!(service.name, "cache");
    }
}

#[test]
fn reports_missing_required_services() {
    let settings = settings(&[("VCAP_SERVICES", SERVICES)]);

    assert_eq!(
        settings.service_uri(&["nothing"]),
        Err(ConfigError::RequiredServiceMissing {
            candidates: vec!["nothing".to_owned()]
        })
    );
    assert_eq!(settings.postgres_uri(&["nothing"]).unwrap(), "postgres://h/db");
}

#[test]
#[serial]
fn serves_cached_values_after_clearing_once() {
    enable_caching();
    let settings = settings(&[("CFG", r#"{"port": 8080}"#)]);

    assert_eq!(settings.resolve("CFG"), settings.resolve("CFG"));
    assert_eq!(settings.cached_keys(), vec!["env_CFG".to_owned()]);

    settings.clear_cache();
    assert!(settings.cached_keys().is_empty());
    assert_eq!(settings.get_int("CFG", &["port"]), 8080);
}

#[derive(Debug, Default)]
struct QueueEnv {
    name: String,
    prefetch: i64,
    durable: bool,
    routes: Vec<String>,
}

impl EnvRecord for QueueEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder
            .string("app_queue.name", |env, name| env.name = name)
            .int("app_queue.consumer.prefetch", |env, prefetch| {
                env.prefetch = prefetch
            })
            .bool("app_queue.durable", |env, durable| env.durable = durable)
            .strings("app_queue.routes", |env, routes| env.routes = routes);
    }
}

#[test]
fn binds_records_from_json_variables() {
    let settings = settings(&[(
        "app_queue",
        r#"{"name": "orders", "consumer": {"prefetch": "25"}, "durable": "T",
            "routes": ["created", "shipped"]}"#,
    )]);
    let env: QueueEnv = settings.parse().unwrap();

    assert_eq!(env.name, "orders");
    assert_eq!(env.prefetch, 25);
    assert!(env.durable);
    assert_eq!(env.routes, vec!["created", "shipped"]);
}

#[test]
fn binds_defaults_when_absent() {
    let env: QueueEnv = settings(&[]).parse().unwrap();

    assert_eq!(env.name, "");
    assert_eq!(env.prefetch, 0);
    assert!(!env.durable);
    assert!(env.routes.is_empty());
}
