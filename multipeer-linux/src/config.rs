//! Load config from file and environment.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

use multipeer_core::ServiceTag;

/// Host configuration. File: ~/.config/multipeer/config.toml or /etc/multipeer/config.toml.
/// Env overrides: MULTIPEER_DISPLAY_NAME, MULTIPEER_SERVICE_TAG, MULTIPEER_SETTINGS_PATH,
/// MULTIPEER_NEIGHBOURS, MULTIPEER_LOG.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Device name the identity is bound to (default: host name).
    #[serde(default)]
    pub display_name: Option<String>,
    /// Service type to advertise and browse (default "multipeer-test").
    #[serde(default)]
    pub service_tag: ServiceTag,
    /// Settings file holding the persisted identity.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
    /// Simulated neighbours attached to the loopback hub (default 2).
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
    /// tracing filter when RUST_LOG is unset (default "info").
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_neighbours() -> usize {
    2
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_name: None,
            service_tag: ServiceTag::default(),
            settings_path: None,
            neighbours: default_neighbours(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Configured device name, else the host name, else "linux".
    pub fn device_name(&self) -> String {
        if let Some(name) = self.display_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.clone();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "linux".to_string())
    }

    /// Configured settings file, else ~/.local/share/multipeer/settings.json.
    pub fn settings_file(&self) -> PathBuf {
        if let Some(p) = &self.settings_path {
            return p.clone();
        }
        match std::env::var_os("HOME") {
            Some(h) => PathBuf::from(h).join(".local/share/multipeer/settings.json"),
            None => PathBuf::from("multipeer-settings.json"),
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> anyhow::Result<Config> {
    let c = load_file().unwrap_or_default();
    apply_env(c, |k| std::env::var(k).ok())
}

fn apply_env(mut c: Config, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    if let Some(s) = var("MULTIPEER_DISPLAY_NAME") {
        c.display_name = Some(s);
    }
    if let Some(s) = var("MULTIPEER_SERVICE_TAG") {
        c.service_tag = s
            .parse()
            .with_context(|| format!("invalid MULTIPEER_SERVICE_TAG {:?}", s))?;
    }
    if let Some(s) = var("MULTIPEER_SETTINGS_PATH") {
        c.settings_path = Some(PathBuf::from(s));
    }
    if let Some(s) = var("MULTIPEER_NEIGHBOURS") {
        if let Ok(n) = s.parse::<usize>() {
            c.neighbours = n;
        }
    }
    if let Some(s) = var("MULTIPEER_LOG") {
        c.log_filter = s;
    }
    Ok(c)
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/multipeer/config.toml"));
    }
    out.push(PathBuf::from("/etc/multipeer/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                match toml::from_str::<Config>(&s) {
                    Ok(c) => return Some(c),
                    // Logging is not up yet; config decides its filter.
                    Err(e) => eprintln!("ignoring {}: {}", p.display(), e),
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let c: Config = toml::from_str("display_name = \"desk\"\nneighbours = 0\n").unwrap();
        assert_eq!(c.device_name(), "desk");
        assert_eq!(c.neighbours, 0);
        assert_eq!(c.service_tag.as_str(), "multipeer-test");
        assert_eq!(c.log_filter, "info");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("proxy_port = 3128\n").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let c = apply_env(Config::default(), |k| match k {
            "MULTIPEER_SERVICE_TAG" => Some("chat".to_string()),
            "MULTIPEER_NEIGHBOURS" => Some("5".to_string()),
            "MULTIPEER_SETTINGS_PATH" => Some("/tmp/s.json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(c.service_tag.as_str(), "chat");
        assert_eq!(c.neighbours, 5);
        assert_eq!(c.settings_file(), PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn bad_number_is_ignored() {
        let c = apply_env(Config::default(), |k| {
            (k == "MULTIPEER_NEIGHBOURS").then(|| "many".to_string())
        })
        .unwrap();
        assert_eq!(c.neighbours, 2);
    }

    #[test]
    fn invalid_service_tag_is_rejected() {
        assert!(toml::from_str::<Config>("service_tag = \"Chat Room\"\n").is_err());
        let err = apply_env(Config::default(), |k| {
            (k == "MULTIPEER_SERVICE_TAG").then(|| "--bad".to_string())
        });
        assert!(err.is_err());
    }

    #[test]
    fn blank_display_name_falls_back() {
        let c = Config {
            display_name: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(!c.device_name().trim().is_empty());
    }
}
