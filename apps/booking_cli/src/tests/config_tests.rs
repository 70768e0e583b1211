use std::collections::HashMap;

use super::*;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:C:\\state\\booking.db"),
        "sqlite://C:/state/booking.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "api_url = \"https://book.example.com\"\nhighlight_millis = 500\n",
    )
    .expect("parse");

    assert_eq!(settings.api_url, "https://book.example.com");
    assert_eq!(settings.highlight_millis, 500);
    assert_eq!(settings.http_timeout(), DEFAULT_HTTP_TIMEOUT);
    assert_eq!(
        settings.controller_settings().highlight_duration,
        Duration::from_millis(500)
    );
}

#[test]
fn rejects_mistyped_file_values() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "http_timeout_seconds = \"soon\"").is_err());
}

#[test]
fn prefixed_env_wins_and_bad_numbers_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_of(&[
            ("BOOKING_API_URL", "http://plain"),
            ("APP__API_URL", "http://prefixed"),
            ("DATABASE_URL", "./elsewhere.db"),
            ("APP__HTTP_TIMEOUT_SECONDS", "abc"),
            ("APP__HIGHLIGHT_MILLIS", "10"),
        ]),
    );

    assert_eq!(settings.api_url, "http://prefixed");
    assert_eq!(settings.database_url, "./elsewhere.db");
    assert_eq!(settings.http_timeout(), DEFAULT_HTTP_TIMEOUT);
    assert_eq!(settings.highlight_millis, 10);
}

#[test]
fn loads_config_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&path, "http_timeout_seconds = 5\n").expect("write config");

    let settings = load_settings(&path).expect("load");
    assert_eq!(settings.http_timeout(), Duration::from_secs(5));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(settings.highlight_millis, 3000);
}
