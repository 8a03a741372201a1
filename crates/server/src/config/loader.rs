use std::path::Path;

use super::schema::ServerConfig;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}

pub fn load_from_file(path: &Path) -> Result<ServerConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<ServerConfig, LoadError> {
    let cfg = if yaml.trim().is_empty() {
        ServerConfig::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &ServerConfig) -> Result<(), LoadError> {
    if cfg.default_org_id <= 0 {
        return Err(LoadError::Validation("default_org_id must be > 0".into()));
    }
    if !LEVELS.contains(&cfg.log.level.to_ascii_lowercase().as_str()) {
        return Err(LoadError::Validation(format!(
            "log.level must be one of {}",
            LEVELS.join(", ")
        )));
    }
    Ok(())
}
