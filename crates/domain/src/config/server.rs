use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the UDP and TCP DNS listeners bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Optional debug/DoH HTTP listener. Disabled when unset.
    #[serde(default)]
    pub http_address: Option<String>,

    /// Serve DNS-over-HTTPS on the HTTP listener at /dns-query.
    #[serde(default)]
    pub doh_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_address: None,
            doh_enabled: false,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:53".to_string()
}
