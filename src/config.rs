//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Where snapshots live and how tasks are validated.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the durable snapshot namespace.
    pub data_dir: PathBuf,
    /// Durable namespace name (one database file per namespace).
    pub namespace: String,
    /// Container inside the namespace that holds the snapshot entry.
    pub container: String,
    /// Key the snapshot is stored under.
    pub snapshot_key: String,
    /// Optional upper bound on the size of a stored snapshot, in bytes.
    pub quota_bytes: Option<usize>,
    /// Maximum task title length, in characters.
    pub max_title_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            namespace: "sqljs-database".to_string(),
            container: "database".to_string(),
            snapshot_key: "database".to_string(),
            quota_bytes: None,
            max_title_len: 200,
        }
    }
}

impl StoreConfig {
    /// Build a config from `TASKLIST_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("TASKLIST_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(namespace) = lookup("TASKLIST_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Some(container) = lookup("TASKLIST_CONTAINER") {
            config.container = container;
        }
        if let Some(key) = lookup("TASKLIST_SNAPSHOT_KEY") {
            config.snapshot_key = key;
        }
        if let Some(quota) = lookup("TASKLIST_QUOTA_BYTES") {
            config.quota_bytes = Some(parse_number("TASKLIST_QUOTA_BYTES", &quota)?);
        }
        if let Some(max) = lookup("TASKLIST_MAX_TITLE_LEN") {
            config.max_title_len = parse_number("TASKLIST_MAX_TITLE_LEN", &max)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject names that cannot be used as a namespace file or container table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("TASKLIST_NAMESPACE", &self.namespace),
            ("TASKLIST_CONTAINER", &self.container),
        ] {
            let valid = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{value}' must be letters, digits, '_' or '-'"),
                });
            }
        }
        if self.snapshot_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "TASKLIST_SNAPSHOT_KEY".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.max_title_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TASKLIST_MAX_TITLE_LEN".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Path of the namespace database file.
    pub fn namespace_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.namespace))
    }
}

fn parse_number(key: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_fixed_identifiers() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.namespace, "sqljs-database");
        assert_eq!(config.container, "database");
        assert_eq!(config.snapshot_key, "database");
        assert_eq!(config.max_title_len, 200);
        assert!(config.quota_bytes.is_none());
        assert_eq!(config.namespace_path(), PathBuf::from("./data/sqljs-database.db"));
    }

    #[test]
    fn reads_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("TASKLIST_DATA_DIR", "/tmp/tasks"),
            ("TASKLIST_QUOTA_BYTES", "4096"),
            ("TASKLIST_MAX_TITLE_LEN", "50"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.quota_bytes, Some(4096));
        assert_eq!(config.max_title_len, 50);
    }

    #[test]
    fn rejects_bad_quota() {
        let err = StoreConfig::from_lookup(lookup(&[("TASKLIST_QUOTA_BYTES", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TASKLIST_QUOTA_BYTES"));
    }

    #[test]
    fn rejects_container_with_quotes() {
        let err = StoreConfig::from_lookup(lookup(&[("TASKLIST_CONTAINER", "db\"; DROP")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
