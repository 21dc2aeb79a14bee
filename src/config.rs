//! Typed, serde-backed bot configuration, loaded from a YAML file on disk.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bot::BotConfig;
use crate::error::ConfigError;

fn default_port() -> u16 {
    6667
}

fn default_prefix() -> String {
    "!".to_owned()
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// One entry of the on-disk `channels` list. Kept as a list (not a map) so
/// join order on disk is the join order sent to the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
}

/// On-disk shape of a bot's configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub nick: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    /// Sent as `PASS` during registration, and again as a NickServ
    /// `IDENTIFY` once registration completes.
    #[serde(default)]
    pub password: Option<String>,
    /// Channels to join, in order, once registration completes.
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default)]
    pub quit_message: Option<String>,
}

/// Validates `config`, returning every problem found rather than stopping at
/// the first, in the teacher's server-config-loader style.
pub fn validate_config(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();
    if config.host.trim().is_empty() {
        errors.push("host must not be empty".to_owned());
    }
    if config.nick.trim().is_empty() {
        errors.push("nick must not be empty".to_owned());
    }
    errors
}

/// Reads and parses `path`, then validates the result.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;
    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(ConfigError::Invalid(errors));
    }
    Ok(config)
}

impl From<Config> for BotConfig {
    fn from(config: Config) -> Self {
        let username = config.username.clone().unwrap_or_else(|| config.nick.clone());
        let realname = config.realname.unwrap_or_else(|| username.clone());
        BotConfig {
            prefix: config.prefix,
            host: config.host,
            port: config.port,
            nick: config.nick,
            username,
            realname,
            password: config.password,
            channel_map: config
                .channels
                .into_iter()
                .map(|entry| (entry.name, entry.key))
                .collect(),
            downloads_dir: config.downloads_dir,
            quit_message: config.quit_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_nick_and_host() {
        let config = Config {
            host: "".to_owned(),
            port: 6667,
            prefix: "!".to_owned(),
            nick: "".to_owned(),
            username: None,
            realname: None,
            password: None,
            channels: Vec::new(),
            downloads_dir: PathBuf::from("downloads"),
            quit_message: None,
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn parses_minimal_yaml() {
        let yaml = "host: irc.example.org\nnick: cogbot\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 6667);
        assert_eq!(config.prefix, "!");
        assert!(config.channels.is_empty());
    }

    #[test]
    fn parses_channel_list_in_order() {
        let yaml = "host: irc.example.org\nnick: cogbot\nchannels:\n  - name: \"#x\"\n  - name: \"#y\"\n    key: secret\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].name, "#x");
        assert_eq!(config.channels[0].key, None);
        assert_eq!(config.channels[1].name, "#y");
        assert_eq!(config.channels[1].key.as_deref(), Some("secret"));
    }

    #[test]
    fn converts_into_bot_config_defaulting_username_and_realname() {
        let yaml = "host: irc.example.org\nnick: cogbot\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let bot_config: BotConfig = config.into();
        assert_eq!(bot_config.username, "cogbot");
        assert_eq!(bot_config.realname, "cogbot");
    }
}
