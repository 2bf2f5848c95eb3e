use super::*;
use std::io::Write;

#[test]
fn defaults_enable_the_notifier() {
    let config = NotifierConfig::default();
    assert!(config.enabled);
    assert_eq!(config.thread_name, "winch-dispatch");
}

#[test]
fn missing_json_fields_fall_back_to_defaults() {
    let config = NotifierConfig::from_json_str(r#"{ "enabled": false }"#).unwrap();
    assert!(!config.enabled);
    assert_eq!(config.thread_name, "winch-dispatch");

    let config = NotifierConfig::from_json_str("{}").unwrap();
    assert_eq!(config, NotifierConfig::default());
}

#[test]
fn load_reads_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "thread_name": "resize" }}"#).unwrap();

    let config = NotifierConfig::load(file.path()).unwrap();
    assert!(config.enabled);
    assert_eq!(config.thread_name, "resize");
}

#[test]
fn load_rejects_malformed_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let err = NotifierConfig::load(file.path()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn disable_flag_accepts_common_truthy_values() {
    for value in ["1", "true", "YES", " on "] {
        let config = NotifierConfig::default().apply_vars(Some(value), None);
        assert!(!config.enabled, "{value:?} should disable");
    }
    for value in ["0", "false", "", "nope"] {
        let config = NotifierConfig::default().apply_vars(Some(value), None);
        assert!(config.enabled, "{value:?} should not disable");
    }
}

#[test]
fn blank_thread_name_override_is_ignored() {
    let config = NotifierConfig::default().apply_vars(None, Some("   "));
    assert_eq!(config.thread_name, "winch-dispatch");

    let config = NotifierConfig::default().apply_vars(None, Some("redraw"));
    assert_eq!(config.thread_name, "redraw");
}
