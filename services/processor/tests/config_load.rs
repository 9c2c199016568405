/// Integration tests for processor config loading: precedence, defaults,
/// required-field validation, and the `NOTIFIER_CONFIG`/`DATABASE_URL`
/// environment overrides.
use processor::config::load_config_from_path;
use std::io::Write;

fn write_config(toml: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    write!(f, "{toml}").expect("write config");
    f
}

const VALID: &str = r#"
queue_url = "https://queue.example/notifications"

[capability_cache]
url = "https://catalog.example/capabilities"

[webhook_cache]
url = "https://catalog.example/webhooks"

[datastore]
url = "postgres://localhost/notifier"
"#;

#[test]
fn valid_minimal_config_loads_ok() {
    let config_file = write_config(VALID);
    let settings = load_config_from_path(config_file.path()).expect("should load");
    assert_eq!(settings.queue_url, "https://queue.example/notifications");
    assert_eq!(settings.batch_size, 10);
    assert_eq!(settings.datastore.url, "postgres://localhost/notifier");
}

#[test]
fn explicit_batch_size_and_topic_prefix_are_loaded() {
    let toml = format!("batch_size = 25\ntopic_prefix = \"rp-\"\n{VALID}");
    let config_file = write_config(&toml);
    let settings = load_config_from_path(config_file.path()).unwrap();
    assert_eq!(settings.batch_size, 25);
    assert_eq!(settings.topic_prefix, "rp-");
}

#[test]
fn missing_datastore_section_fails() {
    let toml = r#"
        queue_url = "https://queue.example/notifications"
        [capability_cache]
        url = "https://catalog.example/capabilities"
        [webhook_cache]
        url = "https://catalog.example/webhooks"
    "#;
    let config_file = write_config(toml);
    assert!(load_config_from_path(config_file.path()).is_err());
}

#[test]
fn custom_refresh_intervals_are_loaded() {
    let toml = r#"
        queue_url = "https://queue.example/notifications"
        [capability_cache]
        url = "https://catalog.example/capabilities"
        refresh_interval_sec = 30
        [webhook_cache]
        url = "https://catalog.example/webhooks"
        refresh_interval_sec = 120
        [datastore]
        url = "postgres://localhost/notifier"
    "#;
    let config_file = write_config(toml);
    let settings = load_config_from_path(config_file.path()).unwrap();
    assert_eq!(settings.capability_refresh_interval_sec, 30);
    assert_eq!(settings.webhook_refresh_interval_sec, 120);
}

#[test]
fn nonexistent_config_file_fails() {
    assert!(load_config_from_path(std::path::Path::new("/nonexistent/config.toml")).is_err());
}
