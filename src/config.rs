use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Honour `X-Forwarded-For`/`X-Real-IP`. Only enable behind a reverse proxy
    /// that overwrites them.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

/// Paging defaults for `GET /locations`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

/// Radius search defaults for `GET /nearby-locations`.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyConfig {
    pub default_radius_km: f64,
    pub max_results: i64,
    pub max_radius_km: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
    pub nearby: NearbyConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self { default_limit: 10, max_limit: 100 }
    }
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self { default_radius_km: 10.0, max_results: 50, max_radius_km: 20_000.0 }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: spotfinder.toml (in CWD)
        .add_source(::config::File::with_name("spotfinder").required(false));

    if let Ok(custom_path) = std::env::var("SPOTFINDER_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("SPOTFINDER").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Database
    if !cfg.database.url.starts_with("postgres://") && !cfg.database.url.starts_with("postgresql://") {
        return Err(anyhow::anyhow!("database.url must be a postgres:// connection string"));
    }
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Auth
    if cfg.auth.jwt_secret.trim().is_empty() {
        return Err(anyhow::anyhow!("auth.jwt_secret must not be empty"));
    }
    if cfg.auth.token_ttl_secs == 0 {
        return Err(anyhow::anyhow!("auth.token_ttl_secs must be > 0"));
    }

    // Search paging
    if cfg.search.default_limit <= 0 || cfg.search.max_limit <= 0 {
        return Err(anyhow::anyhow!("search limits must be > 0"));
    }
    if cfg.search.default_limit > cfg.search.max_limit {
        return Err(anyhow::anyhow!("search.default_limit must be <= search.max_limit"));
    }

    // Nearby
    if !(cfg.nearby.default_radius_km > 0.0) || !(cfg.nearby.max_radius_km > 0.0) {
        return Err(anyhow::anyhow!("nearby radius settings must be > 0"));
    }
    if cfg.nearby.default_radius_km > cfg.nearby.max_radius_km {
        return Err(anyhow::anyhow!("nearby.default_radius_km must be <= nearby.max_radius_km"));
    }
    if cfg.nearby.max_results <= 0 {
        return Err(anyhow::anyhow!("nearby.max_results must be > 0"));
    }

    Ok(())
}
