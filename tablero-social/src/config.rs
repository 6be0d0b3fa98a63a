use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_port() -> u16 { 3010 }
fn default_db() -> String { "tablero_social.db".into() }
fn default_pool_size() -> u32 { 8 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_db(),
            pool_size: default_pool_size(),
        }
    }
}

impl AppConfig {
    /// Reads `TABLERO_SOCIAL__*` variables, e.g. `TABLERO_SOCIAL__DATABASE_URL`.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TABLERO_SOCIAL").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid configuration, falling back to defaults");
            Self::default()
        }))
    }
}
