use std::time::Duration;

use reactive_http_client::{
    attribute::{
        AttributeMap, ConnectionMaxIdleTimeout, ConnectionTimeToLive, ConnectionTimeout,
        MaxConnections,
    },
    header::{self, HeaderSet},
    pool::DefaultKey,
    AsyncHttpClientFactory, ConnectionPoolSettings, ContentType, EngineDefaults,
};

fn four_options() -> AttributeMap {
    AttributeMap::builder()
        .put::<ConnectionTimeout>(Duration::from_secs(1))
        .put::<ConnectionMaxIdleTimeout>(Duration::from_secs(2))
        .put::<MaxConnections>(3)
        .put::<ConnectionTimeToLive>(Duration::from_secs(4))
        .build()
}

#[test]
fn registered_types_resolve_to_the_canonical_instance() {
    for raw in ["application/json", "application/xml", "text/plain", "application/octet-stream"] {
        let a = ContentType::resolve(raw);
        let b = ContentType::resolve(raw);

        let (a, b) = (a.as_registered().unwrap(), b.as_registered().unwrap());
        assert!(std::ptr::eq(a, b), "{} not canonical", raw);
        assert_eq!(a.as_ref(), raw);
    }
}

#[test]
fn unregistered_types_keep_their_spelling() {
    for raw in [
        "application/x-amz-json-1.1",
        "application/vnd.api+json",
        "not a media type",
        "",
    ] {
        let resolved = ContentType::resolve(raw);
        assert!(!resolved.is_registered());
        assert_eq!(resolved.as_str(), raw);
    }
}

#[test]
fn well_known_only_returns_registered_types() {
    let json = ContentType::well_known("application/json").unwrap();
    assert!(json.is_registered());
    assert_eq!(json, ContentType::resolve("application/json"));

    assert_eq!(ContentType::well_known("application/x-amz-json-1.1"), None);
    assert_eq!(ContentType::well_known(""), None);
}

#[test]
fn translation_extracts_content_headers() {
    let headers: HeaderSet = vec![
        ("Content-Type", "application/xml"),
        ("Content-Length", "123"),
        ("Accept", "*/*"),
    ]
    .into_iter()
    .collect();

    let translated = header::translate(&headers).unwrap();

    assert_eq!(
        translated.content_type,
        Some(ContentType::resolve("application/xml"))
    );
    assert_eq!(translated.headers.len(), 1);
    assert_eq!(translated.headers.as_map()["accept"], "*/*");
}

#[test]
fn build_without_sources_uses_the_base_configuration() {
    let base = ConnectionPoolSettings::builder()
        .read_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let client = AsyncHttpClientFactory::new()
        .base_configuration(base.clone())
        .build()
        .unwrap();

    assert_eq!(client.connection_pool_settings(), &base);
}

#[test]
fn build_without_injection_loads_the_base_configuration_from_env() {
    let client = AsyncHttpClientFactory::new().build().unwrap();
    assert_eq!(
        client.connection_pool_settings(),
        &ConnectionPoolSettings::from_env().unwrap()
    );
}

#[test]
fn attribute_map_fallbacks_use_the_builtin_table_by_default() {
    // environment overrides only reach the base configuration
    let client = AsyncHttpClientFactory::new()
        .build_with_defaults(&AttributeMap::empty())
        .unwrap();
    assert_eq!(
        client.connection_pool_settings(),
        &ConnectionPoolSettings::from_defaults(&EngineDefaults::builtin()).unwrap()
    );
}

#[test]
fn base_configuration_and_engine_defaults_are_separate_sources() {
    let base = ConnectionPoolSettings::builder()
        .max_connections(9)
        .build()
        .unwrap();
    let defaults = EngineDefaults::builtin().set(DefaultKey::MaxConnections, 4);

    let factory = AsyncHttpClientFactory::new()
        .base_configuration(base.clone())
        .engine_defaults(defaults);

    let plain = factory.build().unwrap();
    assert_eq!(plain.connection_pool_settings(), &base);

    let from_map = factory.build_with_defaults(&AttributeMap::empty()).unwrap();
    assert_eq!(from_map.connection_pool_settings().max_connections(), 4);

    let with_builder = factory
        .clone()
        .connection_pool_settings_from_attribute_map()
        .build()
        .unwrap();
    assert_eq!(with_builder.connection_pool_settings().max_connections(), 4);

    let custom = factory
        .connection_pool_settings_builder(|_, defaults| {
            ConnectionPoolSettings::from_defaults(defaults)
        })
        .build()
        .unwrap();
    assert_eq!(custom.connection_pool_settings().max_connections(), 4);
}

#[test]
fn attribute_map_builder_reads_every_option() {
    let client = AsyncHttpClientFactory::new()
        .connection_pool_settings_from_attribute_map()
        .engine_defaults(EngineDefaults::builtin())
        .build_with_defaults(&four_options())
        .unwrap();
    let settings = client.connection_pool_settings();

    assert_eq!(settings.connect_timeout(), Duration::from_secs(1));
    assert_eq!(settings.idle_timeout(), Duration::from_secs(2));
    assert_eq!(settings.max_connections(), 3);
    assert_eq!(settings.max_connection_lifetime(), Some(Duration::from_secs(4)));
}

#[test]
fn attribute_map_builder_with_empty_map_matches_defaults() {
    let defaults = EngineDefaults::builtin();
    let factory = AsyncHttpClientFactory::new()
        .connection_pool_settings_from_attribute_map()
        .engine_defaults(defaults.clone());

    let built = factory.build().unwrap();
    let settings = built.connection_pool_settings();

    // an unbounded lifetime compares equal to the zero sentinel of the table
    assert_eq!(settings.max_connection_lifetime(), None);
    assert_eq!(settings.to_engine_defaults(), defaults);

    let with_empty = factory.build_with_defaults(&AttributeMap::empty()).unwrap();
    assert_eq!(with_empty.connection_pool_settings(), settings);
}

#[test]
fn explicit_builder_wins_over_attribute_map() {
    let custom = ConnectionPoolSettings::builder()
        .connect_timeout(Duration::from_millis(42))
        .max_connections(7)
        .max_connection_lifetime(Duration::from_secs(9))
        .build()
        .unwrap();

    let factory = AsyncHttpClientFactory::new()
        .engine_defaults(EngineDefaults::empty())
        .connection_pool_settings_builder({
            let custom = custom.clone();
            move |_, _| Ok(custom.clone())
        });

    let from_build = factory.build().unwrap();
    let from_map = factory.build_with_defaults(&four_options()).unwrap();

    assert_eq!(from_build.connection_pool_settings(), &custom);
    assert_eq!(from_map.connection_pool_settings(), &custom);
}

#[test]
fn missing_default_fails_the_build() {
    let defaults = EngineDefaults::builtin().unset(DefaultKey::ConnectTimeout);

    let err = AsyncHttpClientFactory::new()
        .connection_pool_settings_from_attribute_map()
        .engine_defaults(defaults.clone())
        .build()
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("connectTimeout"));

    let err = AsyncHttpClientFactory::new()
        .connection_pool_settings_from_attribute_map()
        .engine_defaults(defaults.clone())
        .build_with_defaults(&AttributeMap::empty())
        .unwrap_err();
    assert!(err.is_config());

    // supplied by the map, so the hole is never read
    let client = AsyncHttpClientFactory::new()
        .engine_defaults(defaults)
        .build_with_defaults(&four_options())
        .unwrap();
    assert_eq!(
        client.connection_pool_settings().connect_timeout(),
        Duration::from_secs(1)
    );
}

#[test]
fn oversized_max_connections_fails_the_build() {
    let attributes = AttributeMap::builder()
        .put::<MaxConnections>(usize::MAX)
        .build();
    let err = AsyncHttpClientFactory::new()
        .connection_pool_settings_from_attribute_map()
        .build_with_defaults(&attributes)
        .unwrap_err();
    assert!(err.is_config());

    let err = AsyncHttpClientFactory::new()
        .engine_defaults(EngineDefaults::builtin().set(DefaultKey::MaxConnections, u64::MAX))
        .build_with_defaults(&AttributeMap::empty())
        .unwrap_err();
    assert!(err.is_config());
}
