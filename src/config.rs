use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Page size when an audit query does not set `limit`.
    #[serde(default = "default_audit_limit")]
    pub default_limit: u32,
    /// Upper clamp for `limit`.
    #[serde(default = "default_audit_max_limit")]
    pub max_limit: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_limit: default_audit_limit(),
            max_limit: default_audit_max_limit(),
        }
    }
}

fn default_audit_limit() -> u32 {
    50
}

fn default_audit_max_limit() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Max number of status snapshots kept in the broadcast channel for /ws/status (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    64
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.server.host.is_empty(),
            "server.host must be non-empty"
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.audit.default_limit > 0,
            "audit.default_limit must be > 0, got {}",
            self.audit.default_limit
        );
        anyhow::ensure!(
            self.audit.max_limit >= self.audit.default_limit,
            "audit.max_limit must be >= audit.default_limit ({}), got {}",
            self.audit.default_limit,
            self.audit.max_limit
        );
        anyhow::ensure!(
            self.status.broadcast_capacity > 0,
            "status.broadcast_capacity must be > 0, got {}",
            self.status.broadcast_capacity
        );
        Ok(())
    }
}
