//! Server configuration read from the environment

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

pub const DEFAULT_PORT: u16 = 8000;

/// Cache directory on serverless hosts, where only `/tmp` is writable
const SERVERLESS_CACHE_DIR: &str = "/tmp/f1_cache";
const LOCAL_CACHE_DIR: &str = "f1_cache";

/// Origins allowed to call the API from a browser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedOrigins {
    /// Any origin, without credentials
    #[default]
    Any,
    /// An explicit list, with credentials
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse `*` or a comma-separated origin list
    ///
    /// Entries are trimmed and lose a trailing `/` so they compare equal to
    /// the browser's `Origin` header.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }

    /// Build the CORS layer for these origins
    ///
    /// Credentials cannot be combined with wildcard methods or headers, so
    /// the explicit list mirrors whatever the preflight request asks for.
    pub fn cors_layer(&self) -> CorsLayer {
        match self {
            AllowedOrigins::Any => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
            AllowedOrigins::List(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(v) => Some(v),
                        Err(_) => {
                            tracing::warn!("Ignoring invalid origin '{}'", o);
                            None
                        }
                    })
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_credentials(true)
                    .allow_methods(AllowMethods::mirror_request())
                    .allow_headers(AllowHeaders::mirror_request())
            }
        }
    }
}

/// Which session source backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Cache,
    Demo,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cache" => Ok(SourceKind::Cache),
            "demo" => Ok(SourceKind::Demo),
            other => Err(format!("unknown source '{}' (expected cache or demo)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allowed_origins: AllowedOrigins,
    pub cache_dir: PathBuf,
    pub source: SourceKind,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| AllowedOrigins::parse(&raw))
            .unwrap_or_default();

        let serverless = lookup("VERCEL").is_some() || lookup("RENDER").is_some();
        let cache_dir = lookup("PRAH_CACHE_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                PathBuf::from(if serverless {
                    SERVERLESS_CACHE_DIR
                } else {
                    LOCAL_CACHE_DIR
                })
            });

        let source = match lookup("PRAH_SOURCE") {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => SourceKind::default(),
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{}': {}", raw, e))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            allowed_origins,
            cache_dir,
            source,
            host,
            port,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}:{}: {}", self.host, self.port, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert_eq!(config.cache_dir, PathBuf::from("f1_cache"));
        assert_eq!(config.source, SourceKind::Cache);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn test_origin_list_is_trimmed() {
        let origins = AllowedOrigins::parse(" https://a.example/ ,https://b.example,, ");
        assert_eq!(
            origins,
            AllowedOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
        assert_eq!(AllowedOrigins::parse(""), AllowedOrigins::Any);
    }

    #[test]
    fn test_serverless_cache_dir() {
        let render = config(&[("RENDER", "true")]).unwrap();
        assert_eq!(render.cache_dir, PathBuf::from("/tmp/f1_cache"));

        let overridden = config(&[("VERCEL", "1"), ("PRAH_CACHE_DIR", "/data/cache")]).unwrap();
        assert_eq!(overridden.cache_dir, PathBuf::from("/data/cache"));
    }

    #[test]
    fn test_source_and_port() {
        let demo = config(&[
            ("PRAH_SOURCE", "Demo"),
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
        ])
        .unwrap();
        assert_eq!(demo.source, SourceKind::Demo);
        assert_eq!(demo.bind_addr().unwrap().to_string(), "127.0.0.1:9000");

        assert!(config(&[("PRAH_SOURCE", "live")]).is_err());
        assert!(config(&[("PORT", "eighty")]).is_err());
    }
}
