use mystrom_config::{AppConfig, ConfigError, DEFAULT_VENDOR_URL};

// 环境变量为进程级状态，所有场景放在同一个测试中顺序执行。
#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var/remove_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::remove_var("MYSTROM_PLATFORM_URL");
        std::env::set_var("MYSTROM_PLATFORM_TOKEN", "token");
    }
    let err = AppConfig::from_env().expect_err("missing url");
    assert!(matches!(err, ConfigError::Missing(key) if key == "MYSTROM_PLATFORM_URL"));

    unsafe {
        std::env::set_var("MYSTROM_PLATFORM_URL", "http://platform.local/v2");
        std::env::remove_var("MYSTROM_DATABASE_URL");
        std::env::remove_var("MYSTROM_VENDOR_URL");
        std::env::set_var("MYSTROM_HTTP_ADDR", "127.0.0.1:3001");
        std::env::set_var("MYSTROM_LISTENER_RETRY_SECONDS", "7");
        std::env::set_var("MYSTROM_NOTIFY_NEW_ASSETS", "off");
    }
    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.platform_url, "http://platform.local/v2");
    assert_eq!(config.platform_token, "token");
    assert!(config.database_url.is_none());
    assert_eq!(config.vendor_url, DEFAULT_VENDOR_URL);
    assert_eq!(config.http_addr, "127.0.0.1:3001");
    assert_eq!(config.scan_interval_seconds, 1);
    assert_eq!(config.listener_retry_seconds, 7);
    assert!(!config.notify_new_assets);

    unsafe {
        std::env::set_var("MYSTROM_SCAN_INTERVAL_SECONDS", "soon");
    }
    let err = AppConfig::from_env().expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "MYSTROM_SCAN_INTERVAL_SECONDS"));
    unsafe {
        std::env::remove_var("MYSTROM_SCAN_INTERVAL_SECONDS");
    }
}
