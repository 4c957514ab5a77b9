use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "POSTGRES_DSN")]
    pub dsn: String,

    #[envconfig(from = "POSTGRES_MAX_CONNECTIONS", default = "5")]
    pub max_connections: u32,

    #[envconfig(from = "POSTGRES_ACQUIRE_TIMEOUT_SECS", default = "2")]
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("dsn", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}
