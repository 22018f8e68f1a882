use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.server.ws_url, "ws://127.0.0.1:8000/ws");
    assert_eq!(config.server.api_base, "http://127.0.0.1:8000");
    assert!(config.server.authorization.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_connection_durations() {
    let config = ConnectionConfig::default();
    assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
    assert_eq!(config.ping_interval(), Duration::from_secs(15));
    assert_eq!(config.pong_timeout(), Duration::from_secs(10));
    assert_eq!(config.outbound_buffer, 64);
    assert_eq!(config.inbound_buffer, 256);
}

#[test]
fn test_backoff_default() {
    let config = BackoffConfig::default();
    assert_eq!(config.base_delay_ms, 1_000);
    assert_eq!(config.max_delay_ms, 30_000);
    assert_eq!(config.multiplier, 2.0);
    assert!(config.jitter);
}

#[test]
fn test_dispatch_default() {
    assert_eq!(DispatchConfig::default().timeout(), Duration::from_secs(5));
}

#[test]
fn test_partial_section_keeps_defaults() {
    let config: Config = toml::from_str(
        r#"
        [connection]
        ping_interval_ms = 500
        "#,
    )
    .unwrap();
    assert_eq!(config.connection.ping_interval_ms, 500);
    assert_eq!(config.connection.pong_timeout_ms, 10_000);
}

#[test]
fn test_backoff_jitter_disabled() {
    let config: Config = toml::from_str(
        r#"
        [backoff]
        jitter = false
        "#,
    )
    .unwrap();
    assert!(!config.backoff.jitter);
    assert_eq!(config.backoff.base_delay_ms, 1_000);
}

#[test]
fn test_config_roundtrip_through_toml() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.server.ws_url, config.server.ws_url);
    assert_eq!(parsed.dispatch.timeout_ms, config.dispatch.timeout_ms);
}
