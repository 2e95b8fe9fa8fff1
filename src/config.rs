pub const DEFAULT_PORT: u16 = 6481;
pub const DEFAULT_METRICS_PORT: u16 = 9091;
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;
pub const DEFAULT_MAX_RESP_ARGS: usize = 1024 * 1024;
pub const DEFAULT_MAX_RESP_BULK_LEN: usize = 512 * 1024 * 1024; // 512 MiB
pub const DEFAULT_MAX_RESP_INLINE_LEN: usize = 64 * 1024;

pub struct Config {
    pub port: u16,
    pub host: String,
    /// Namespace applied to every client of this proxy. `None` means
    /// passthrough.
    pub namespace: Option<String>,
    /// `host:port` of the RESP store to forward to. `None` serves from an
    /// embedded in-memory store.
    pub upstream: Option<String>,
    pub metrics_port: u16,
    pub metrics_host: String,
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            namespace: None,
            upstream: None,
            metrics_port: DEFAULT_METRICS_PORT,
            metrics_host: "0.0.0.0".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("KVNS_PROXY_PORT").ok().as_deref(),
            std::env::var("KVNS_PROXY_HOST").ok().as_deref(),
            std::env::var("KVNS_PROXY_NAMESPACE").ok().as_deref(),
            std::env::var("KVNS_PROXY_UPSTREAM").ok().as_deref(),
            std::env::var("KVNS_PROXY_METRICS_PORT").ok().as_deref(),
            std::env::var("KVNS_PROXY_METRICS_HOST").ok().as_deref(),
            std::env::var("KVNS_PROXY_MAX_CONNECTIONS").ok().as_deref(),
        )
    }

    fn from_vars(
        port: Option<&str>,
        host: Option<&str>,
        namespace: Option<&str>,
        upstream: Option<&str>,
        metrics_port: Option<&str>,
        metrics_host: Option<&str>,
        max_connections: Option<&str>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            port: port
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            host: host
                .map(|s| s.to_string())
                .unwrap_or(defaults.host),
            namespace: namespace
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            upstream: upstream
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            metrics_port: metrics_port
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.metrics_port),
            metrics_host: metrics_host
                .map(|s| s.to_string())
                .unwrap_or(defaults.metrics_host),
            max_connections: max_connections
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_connections),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metrics_listen_addr(&self) -> String {
        format!("{}:{}", self.metrics_host, self.metrics_port)
    }
}
