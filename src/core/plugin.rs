//! Plugin references such as `docker#v3.0.1`

use regex::Regex;
use serde_yaml::Value;
use std::fmt;
use std::sync::OnceLock;

/// A plugin name with an optional pinned version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginRef {
    pub name: String,
    pub version: Option<String>,
}

fn plugin_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<name>[^#\s]+)(?:#(?P<version>\S+))?\s*$").expect("valid plugin regex")
    })
}

impl PluginRef {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse `name` or `name#version`. Returns `None` for blank or malformed keys.
    pub fn parse(key: &str) -> Option<Self> {
        let caps = plugin_ref_regex().captures(key)?;
        Some(Self {
            name: caps["name"].to_string(),
            version: caps.name("version").map(|m| m.as_str().to_string()),
        })
    }

    /// Whether this reference points at the plugin called `name`.
    ///
    /// Plugins may be given as a full repository path (`org/docker-buildkite-plugin`),
    /// so the last path segment is compared too.
    pub fn is_named(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        let last = self.name.rsplit('/').next().unwrap_or(&self.name);
        last == name || last == format!("{}-buildkite-plugin", name)
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}#{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One entry of a step's `plugins` list, split into reference and config
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    pub plugin: PluginRef,
    pub config: Value,
}

impl PluginEntry {
    /// Interpret a raw `plugins` list entry.
    ///
    /// Entries are either a bare `name#version` string or a single-key mapping
    /// from that string to the plugin's configuration.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(key) => {
                let plugin = PluginRef::parse(key)
                    .ok_or_else(|| format!("invalid plugin reference '{}'", key))?;
                Ok(Self {
                    plugin,
                    config: Value::Null,
                })
            }
            Value::Mapping(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "plugin entry must have exactly one key, found {}",
                        map.len()
                    ));
                }
                let (key, config) = map
                    .iter()
                    .next()
                    .ok_or_else(|| "empty plugin entry".to_string())?;
                let key = key
                    .as_str()
                    .ok_or_else(|| "plugin key must be a string".to_string())?;
                let plugin = PluginRef::parse(key)
                    .ok_or_else(|| format!("invalid plugin reference '{}'", key))?;
                Ok(Self {
                    plugin,
                    config: config.clone(),
                })
            }
            _ => Err("plugin entry must be a string or a mapping".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versioned_plugin() {
        let plugin = PluginRef::parse("docker#v3.0.1").unwrap();
        assert_eq!(plugin.name, "docker");
        assert_eq!(plugin.version.as_deref(), Some("v3.0.1"));
        assert_eq!(plugin.to_string(), "docker#v3.0.1");
    }

    #[test]
    fn test_parse_unversioned_plugin() {
        let plugin = PluginRef::parse("docker").unwrap();
        assert_eq!(plugin.version, None);
        assert!(PluginRef::parse("   ").is_none());
        assert!(PluginRef::parse("docker#").is_none());
    }

    #[test]
    fn test_is_named_matches_repository_paths() {
        assert!(PluginRef::parse("docker#v3.0.1").unwrap().is_named("docker"));
        assert!(PluginRef::parse("acme/docker-buildkite-plugin#v1").unwrap().is_named("docker"));
        assert!(!PluginRef::parse("docker-compose#v4").unwrap().is_named("docker"));
    }

    #[test]
    fn test_entry_from_mapping() {
        let value: Value = serde_yaml::from_str("docker#v3.0.1:\n  image: rust:1.80\n").unwrap();
        let entry = PluginEntry::from_value(&value).unwrap();
        assert_eq!(entry.plugin.name, "docker");
        assert_eq!(entry.config["image"].as_str(), Some("rust:1.80"));
    }

    #[test]
    fn test_entry_rejects_multi_key_mapping() {
        let value: Value = serde_yaml::from_str("a: 1\nb: 2\n").unwrap();
        assert!(PluginEntry::from_value(&value).is_err());
    }
}
