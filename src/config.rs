use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::{DEFAULT_CONTAINER, DEFAULT_NAMESPACE};

const ENV_PREFIX: &str = "GBE_INVOKER_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Service configuration: identity, logging, report storage, and limits.
///
/// Opaque to the invocation runner; passed through to jobs via the
/// invocation context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub service_name: String,
    pub instance_name: String,
    pub log_level: String,
    pub log_json: bool,
    /// Root directory for local report storage. Unset means no storage.
    pub storage_root: Option<PathBuf>,
    pub report_container: String,
    pub report_namespace: String,
    /// Upper bound on follow-up invocations drained after the first.
    pub max_follow_ups: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "gbe-invoker".to_string(),
            instance_name: "local".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            storage_root: None,
            report_container: DEFAULT_CONTAINER.to_string(),
            report_namespace: DEFAULT_NAMESPACE.to_string(),
            max_follow_ups: 16,
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `GBE_INVOKER_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Apply `GBE_INVOKER_*` overrides from an explicit variable list.
    pub fn with_overrides<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "SERVICE_NAME" => self.service_name = value,
                "INSTANCE_NAME" => self.instance_name = value,
                "LOG_LEVEL" => self.log_level = value,
                "LOG_JSON" => self.log_json = parse_bool(&key, &value)?,
                "STORAGE_ROOT" => self.storage_root = Some(PathBuf::from(value)),
                "REPORT_CONTAINER" => self.report_container = value,
                "REPORT_NAMESPACE" => self.report_namespace = value,
                "MAX_FOLLOW_UPS" => {
                    self.max_follow_ups = value.parse().map_err(|_| ConfigError::Invalid {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                }
                _ => {}
            }
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(ServiceConfig::from_yaml_str("").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ServiceConfig::from_yaml_str("instance_name: worker-3\nlog_json: true\n").unwrap();
        assert_eq!(config.instance_name, "worker-3");
        assert!(config.log_json);
        assert_eq!(config.report_container, "stats");
        assert_eq!(config.max_follow_ups, 16);
    }

    #[test]
    fn unknown_yaml_field_rejected() {
        let err = ServiceConfig::from_yaml_str("bogus: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let config = ServiceConfig::default()
            .with_overrides(vars(&[
                ("GBE_INVOKER_LOG_LEVEL", "debug"),
                ("GBE_INVOKER_LOG_JSON", "yes"),
                ("GBE_INVOKER_STORAGE_ROOT", "/var/lib/gbe"),
                ("GBE_INVOKER_MAX_FOLLOW_UPS", "4"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);
        assert_eq!(config.storage_root, Some(PathBuf::from("/var/lib/gbe")));
        assert_eq!(config.max_follow_ups, 4);
    }

    #[test]
    fn invalid_env_override_names_key() {
        let err = ServiceConfig::default()
            .with_overrides(vars(&[("GBE_INVOKER_MAX_FOLLOW_UPS", "lots")]))
            .unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "GBE_INVOKER_MAX_FOLLOW_UPS"),
            other => panic!("expected Invalid, got: {other}"),
        }
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoker.yaml");
        std::fs::write(&path, "service_name: stats\n").unwrap();
        let config = ServiceConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.service_name, "stats");

        let err = ServiceConfig::from_yaml_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
