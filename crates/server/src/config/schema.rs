use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_rest_addr")]
    pub rest_addr: SocketAddr,
    #[serde(default = "default_org_id")]
    pub default_org_id: i64,
    #[serde(default)]
    pub pagination: PaginationMode,
    /// YAML document seeding the in-memory stores at startup.
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
    #[serde(default)]
    pub log: LogConfig,
}

/// Which rule store contract drives pagination.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// The store pages by group and hands back its own token.
    #[default]
    Cursor,
    /// Every visible rule is fetched and paged client-side.
    Scan,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: default_rest_addr(),
            default_org_id: default_org_id(),
            pagination: PaginationMode::default(),
            fixtures: None,
            log: LogConfig::default(),
        }
    }
}

fn default_rest_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_org_id() -> i64 {
    1
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full() {
        let yaml = r#"
rest_addr: 127.0.0.1:9090
default_org_id: 3
pagination: scan
fixtures: /etc/vigil/fixtures.yaml
log:
  level: debug
  json: true
"#;
        let cfg: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.rest_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(cfg.default_org_id, 3);
        assert_eq!(cfg.pagination, PaginationMode::Scan);
        assert_eq!(cfg.fixtures, Some(PathBuf::from("/etc/vigil/fixtures.yaml")));
        assert_eq!(cfg.log.level, "debug");
        assert!(cfg.log.json);
    }

    #[test]
    fn defaults_applied() {
        let cfg: ServerConfig = serde_yaml::from_str("log: {}").unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.rest_addr.port(), 8080);
        assert_eq!(cfg.pagination, PaginationMode::Cursor);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn unknown_pagination_mode_rejected() {
        assert!(serde_yaml::from_str::<ServerConfig>("pagination: offset").is_err());
    }
}
