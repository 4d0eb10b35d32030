use serde::Deserialize;

use crate::domain::models::ServerDescriptor;

#[derive(Debug)]
pub struct ConfigError(String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// The static memcached server list plus client-side connection knobs.
/// The list is loaded once at process start and never changes afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_servers")]
    pub servers: Vec<ServerDescriptor>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: StringOrVec,
}

#[derive(Debug, Clone)]
pub struct StringOrVec(pub Vec<String>);

impl<'de> serde::Deserialize<'de> for StringOrVec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct StringOrVecVisitor;

        impl<'de> Visitor<'de> for StringOrVecVisitor {
            type Value = StringOrVec;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(StringOrVec(
                    v.split(',').map(|s| s.trim().to_string()).collect(),
                ))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(s) = seq.next_element::<String>()? {
                    vec.push(s);
                }
                Ok(StringOrVec(vec))
            }
        }

        deserializer.deserialize_any(StringOrVecVisitor)
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_cache_servers() -> Vec<ServerDescriptor> {
    vec![ServerDescriptor {
        host: "127.0.0.1".to_string(),
        port: 11211,
        friendly_name: "Server 1".to_string(),
    }]
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_allowed_origins() -> StringOrVec {
    StringOrVec(vec![
        "http://localhost:5173".to_string(),
        "http://localhost:8080".to_string(),
    ])
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            servers: default_cache_servers(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Parses the `MEMDASH_SERVERS` value: comma-separated `host:port:Friendly Name`
/// entries, e.g. `127.0.0.1:11211:Server 1,10.0.0.2:11211:Failover`.
/// The friendly name is optional and defaults to `Server <n>`.
fn parse_servers(raw: &str) -> Result<Vec<ServerDescriptor>, ConfigError> {
    let mut servers = Vec::new();

    for (i, entry) in raw.split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let mut parts = entry.splitn(3, ':');
        let host = parts
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError(format!("Missing host in server entry '{}'", entry)))?;
        let port: u16 = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(|| ConfigError(format!("Invalid port in server entry '{}'", entry)))?;
        let friendly_name = parts
            .next()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Server {}", i + 1));

        servers.push(ServerDescriptor {
            host: host.to_string(),
            port,
            friendly_name,
        });
    }

    if servers.is_empty() {
        return Err(ConfigError(
            "MEMDASH_SERVERS must contain at least one server entry".to_string(),
        ));
    }

    Ok(servers)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Settings {
            server: ServerSettings {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_port),
            },
            cache: CacheSettings {
                servers: match std::env::var("MEMDASH_SERVERS") {
                    Ok(raw) => parse_servers(&raw)?,
                    Err(_) => default_cache_servers(),
                },
                connect_timeout_secs: std::env::var("MEMDASH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_connect_timeout),
            },
            logging: LoggingSettings {
                level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
                format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| default_log_format()),
            },
            cors: CorsSettings {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| StringOrVec(s.split(',').map(|s| s.trim().to_string()).collect()))
                    .unwrap_or_else(|_| default_allowed_origins()),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.servers.is_empty() {
            return Err(ConfigError(
                "At least one memcached server must be configured".to_string(),
            ));
        }

        if self.cache.connect_timeout_secs == 0 {
            return Err(ConfigError(
                "MEMDASH_CONNECT_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_server_entries() {
        let servers =
            parse_servers("127.0.0.1:11211:Server 1,10.0.0.2:21211:Backup").unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].host, "127.0.0.1");
        assert_eq!(servers[0].port, 11211);
        assert_eq!(servers[0].friendly_name, "Server 1");
        assert_eq!(servers[1].friendly_name, "Backup");
    }

    #[test]
    fn friendly_name_defaults_to_position() {
        let servers = parse_servers("127.0.0.1:11211").unwrap();
        assert_eq!(servers[0].friendly_name, "Server 1");
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(parse_servers("127.0.0.1:notaport:X").is_err());
    }

    #[test]
    fn rejects_empty_list() {
        assert!(parse_servers("").is_err());
        assert!(parse_servers(" , ").is_err());
    }
}
