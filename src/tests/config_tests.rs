#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig};
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Environment variables are process-wide; tests touching them take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.starts_with("postgres://"));
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.max_limit, 100);
        assert_eq!(config.nearby.default_radius_km, 10.0);
        assert_eq!(config.nearby.max_results, 50);
        assert!(config.security.is_none());
        assert!(!config.server.trust_proxy_headers);
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(config::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_valid_config_does_not_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert!(config::load().is_ok());
    }

    #[test]
    fn test_invalid_server_port() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid server.port"));
    }

    #[test]
    fn test_non_postgres_url_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite://data/spots.db".to_string();
        assert!(config::validate(&cfg).is_err());
    }

    #[test]
    fn test_empty_jwt_secret_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.auth.jwt_secret = "   ".to_string();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_paging_limits_must_be_consistent() {
        let mut cfg = AppConfig::default();
        cfg.search.default_limit = 200;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.search.max_limit = 0;
        assert!(config::validate(&cfg).is_err());
    }

    #[test]
    fn test_nearby_settings_must_be_positive() {
        let mut cfg = AppConfig::default();
        cfg.nearby.default_radius_km = 0.0;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.nearby.default_radius_km = f64::NAN;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.nearby.max_results = 0;
        assert!(config::validate(&cfg).is_err());
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("SPOTFINDER__SERVER__HOST", "0.0.0.0");
        env::set_var("SPOTFINDER__SERVER__PORT", "3000");
        env::set_var("SPOTFINDER__NEARBY__MAX_RESULTS", "25");

        let result = config::load();

        env::remove_var("SPOTFINDER__SERVER__HOST");
        env::remove_var("SPOTFINDER__SERVER__PORT");
        env::remove_var("SPOTFINDER__NEARBY__MAX_RESULTS");

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.nearby.max_results, 25);
    }

    #[test]
    fn test_invalid_port_from_env_fails_load() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("SPOTFINDER__SERVER__PORT", "0");
        let result = config::load();
        env::remove_var("SPOTFINDER__SERVER__PORT");

        assert!(result.unwrap_err().to_string().contains("invalid server.port"));
    }

    #[test]
    fn test_config_file_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = write_temp_config(
            r#"
[search]
default_limit = 20
max_limit = 40

[security]
enable_hsts = true
"#,
        );
        env::set_var("SPOTFINDER_CONFIG", file.path());
        let result = config::load();
        env::remove_var("SPOTFINDER_CONFIG");

        let config = result.unwrap();
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.search.max_limit, 40);
        assert_eq!(config.security.and_then(|s| s.enable_hsts), Some(true));
        // untouched sections keep their defaults
        assert_eq!(config.server.port, 8080);
    }
}
