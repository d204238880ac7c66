//! Configuration management for Pressbot
//!
//! Everything is read from the environment. Scan policy thresholds can
//! additionally come from an optional TOML file named by `PRESSBOT_CONFIG`:
//!
//! ```toml
//! [policy]
//! high_water_mark = 10000
//! evict_batch_size = 5000
//! posts_per_account = 20
//! list_page_limit = 100
//! account_delay = "1s"
//! ```
//!
//! Precedence is defaults, then the file, then `PRESSBOT_*` variables.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::{parse_keywords, DEFAULT_KEYWORDS};
use crate::directory::DEFAULT_LIST_PAGE_LIMIT;
use crate::error::{ConfigError, Result};
use crate::platforms::bluesky::DEFAULT_SERVICE;
use crate::seen::{DEFAULT_EVICT_BATCH_SIZE, DEFAULT_HIGH_WATER_MARK};

pub const ENV_USERNAME: &str = "BLUESKY_USERNAME";
pub const ENV_PASSWORD: &str = "BLUESKY_PASSWORD";
pub const ENV_LIST_URI: &str = "UNIVERSITY_PRESS_LIST_URI";
pub const ENV_KEYWORDS: &str = "SALES_KEYWORDS";
pub const ENV_SERVICE: &str = "BLUESKY_SERVICE";
pub const ENV_STATE_FILE: &str = "PRESSBOT_STATE_FILE";
pub const ENV_CONFIG: &str = "PRESSBOT_CONFIG";
pub const ENV_HIGH_WATER_MARK: &str = "PRESSBOT_HIGH_WATER_MARK";
pub const ENV_EVICT_BATCH: &str = "PRESSBOT_EVICT_BATCH";
pub const ENV_POSTS_PER_ACCOUNT: &str = "PRESSBOT_POSTS_PER_ACCOUNT";
pub const ENV_LIST_PAGE_LIMIT: &str = "PRESSBOT_LIST_PAGE_LIMIT";
pub const ENV_ACCOUNT_DELAY: &str = "PRESSBOT_ACCOUNT_DELAY";

/// Seen-set location used when `PRESSBOT_STATE_FILE` is unset
pub const DEFAULT_STATE_FILE: &str = "data/processed_posts.json";

/// Default number of recent posts fetched per account
pub const DEFAULT_POSTS_PER_ACCOUNT: usize = 20;

/// Default pause between accounts
pub const DEFAULT_ACCOUNT_DELAY: Duration = Duration::from_millis(1000);

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug)]
pub struct Config {
    pub bluesky: BlueskyConfig,
    pub list_uri: String,
    pub keywords: Vec<String>,
    pub state_file: PathBuf,
    pub policy: ScanPolicy,
}

#[derive(Debug)]
pub struct BlueskyConfig {
    pub username: String,
    pub password: SecretString,
    pub service: String,
}

/// Thresholds and pacing for a scan run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    pub high_water_mark: usize,
    pub evict_batch_size: usize,
    pub posts_per_account: usize,
    pub list_page_limit: usize,
    pub account_delay: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            evict_batch_size: DEFAULT_EVICT_BATCH_SIZE,
            posts_per_account: DEFAULT_POSTS_PER_ACCOUNT,
            list_page_limit: DEFAULT_LIST_PAGE_LIMIT,
            account_delay: DEFAULT_ACCOUNT_DELAY,
        }
    }
}

impl ScanPolicy {
    /// Overlay the `[policy]` table of a config file
    ///
    /// Errors name the offending key as `policy.<key>`.
    fn apply_file(&mut self, table: PolicyTable) -> Result<()> {
        if let Some(value) = table.high_water_mark {
            self.high_water_mark = check_positive("policy.high_water_mark", value)?;
        }
        if let Some(value) = table.evict_batch_size {
            self.evict_batch_size = check_positive("policy.evict_batch_size", value)?;
        }
        if let Some(value) = table.posts_per_account {
            self.posts_per_account = check_page_size("policy.posts_per_account", value)?;
        }
        if let Some(value) = table.list_page_limit {
            self.list_page_limit = check_page_size("policy.list_page_limit", value)?;
        }
        if let Some(value) = table.account_delay {
            self.account_delay = parse_duration("policy.account_delay", &value)?;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup_nonempty(lookup, ENV_HIGH_WATER_MARK) {
            let count = parse_count(ENV_HIGH_WATER_MARK, &value)?;
            self.high_water_mark = check_positive(ENV_HIGH_WATER_MARK, count)?;
        }
        if let Some(value) = lookup_nonempty(lookup, ENV_EVICT_BATCH) {
            let count = parse_count(ENV_EVICT_BATCH, &value)?;
            self.evict_batch_size = check_positive(ENV_EVICT_BATCH, count)?;
        }
        if let Some(value) = lookup_nonempty(lookup, ENV_POSTS_PER_ACCOUNT) {
            let count = parse_count(ENV_POSTS_PER_ACCOUNT, &value)?;
            self.posts_per_account = check_page_size(ENV_POSTS_PER_ACCOUNT, count)?;
        }
        if let Some(value) = lookup_nonempty(lookup, ENV_LIST_PAGE_LIMIT) {
            let count = parse_count(ENV_LIST_PAGE_LIMIT, &value)?;
            self.list_page_limit = check_page_size(ENV_LIST_PAGE_LIMIT, count)?;
        }
        if let Some(value) = lookup_nonempty(lookup, ENV_ACCOUNT_DELAY) {
            self.account_delay = parse_duration(ENV_ACCOUNT_DELAY, &value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    policy: PolicyTable,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyTable {
    high_water_mark: Option<usize>,
    evict_batch_size: Option<usize>,
    posts_per_account: Option<usize>,
    list_page_limit: Option<usize>,
    account_delay: Option<String>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup_nonempty(&lookup, ENV_USERNAME)
            .ok_or_else(|| ConfigError::MissingField(ENV_USERNAME.to_string()))?;
        let password = lookup_nonempty(&lookup, ENV_PASSWORD)
            .ok_or_else(|| ConfigError::MissingField(ENV_PASSWORD.to_string()))?;
        let list_uri = lookup_nonempty(&lookup, ENV_LIST_URI)
            .ok_or_else(|| ConfigError::MissingField(ENV_LIST_URI.to_string()))?;

        let keywords = match lookup_nonempty(&lookup, ENV_KEYWORDS) {
            Some(raw) => parse_keywords(&raw),
            None => DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        };

        let service =
            lookup_nonempty(&lookup, ENV_SERVICE).unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        let state_file = lookup_nonempty(&lookup, ENV_STATE_FILE)
            .map(|path| expand_path(&path))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let mut policy = ScanPolicy::default();
        if let Some(path) = lookup_nonempty(&lookup, ENV_CONFIG) {
            policy.apply_file(load_policy_file(&expand_path(&path))?)?;
        }
        policy.apply_env(&lookup)?;

        Ok(Self {
            bluesky: BlueskyConfig {
                username,
                password: SecretString::from(password),
                service,
            },
            list_uri,
            keywords,
            state_file,
            policy,
        })
    }
}

fn load_policy_file(path: &Path) -> Result<PolicyTable> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
    let file: ConfigFile = toml::from_str(&content).map_err(ConfigError::ParseError)?;
    Ok(file.policy)
}

fn lookup_nonempty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| invalid(name, &format!("'{}' is not a whole number ({})", value, e)).into())
}

fn check_positive(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(invalid(name, "must be greater than zero").into());
    }
    Ok(value)
}

/// Page sizes the Bluesky list and feed endpoints accept
fn check_page_size(name: &str, value: usize) -> Result<usize> {
    if !(1..=MAX_PAGE_SIZE).contains(&value) {
        return Err(invalid(name, &format!("must be between 1 and {}", MAX_PAGE_SIZE)).into());
    }
    Ok(value)
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| invalid(name, &format!("'{}' is not a duration ({})", value, e)).into())
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue(name.to_string(), reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PressbotError;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn base_env() -> HashMap<String, String> {
        HashMap::from([
            (ENV_USERNAME.to_string(), "pressbot.bsky.social".to_string()),
            (ENV_PASSWORD.to_string(), "app-password".to_string()),
            (
                ENV_LIST_URI.to_string(),
                "at://did:plc:owner/app.bsky.graph.list/presses".to_string(),
            ),
        ])
    }

    fn load(env: &HashMap<String, String>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    fn missing_field(result: Result<Config>) -> String {
        match result {
            Err(PressbotError::Config(ConfigError::MissingField(field))) => field,
            other => panic!("Expected missing field error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.bluesky.username, "pressbot.bsky.social");
        assert_eq!(config.bluesky.password.expose_secret(), "app-password");
        assert_eq!(config.bluesky.service, "https://bsky.social");
        assert_eq!(
            config.keywords,
            vec!["sale", "discount", "offer", "special", "promotion", "deal"]
        );
        assert_eq!(config.state_file, PathBuf::from("data/processed_posts.json"));
        assert_eq!(config.policy, ScanPolicy::default());
        assert_eq!(config.policy.high_water_mark, 10_000);
        assert_eq!(config.policy.evict_batch_size, 5_000);
        assert_eq!(config.policy.posts_per_account, 20);
        assert_eq!(config.policy.list_page_limit, 100);
        assert_eq!(config.policy.account_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_missing_credentials() {
        let mut env = base_env();
        env.remove(ENV_USERNAME);
        assert_eq!(missing_field(load(&env)), ENV_USERNAME);

        let mut env = base_env();
        env.insert(ENV_PASSWORD.to_string(), "  ".to_string());
        assert_eq!(missing_field(load(&env)), ENV_PASSWORD);
    }

    #[test]
    fn test_missing_list_uri() {
        let mut env = base_env();
        env.remove(ENV_LIST_URI);
        assert_eq!(missing_field(load(&env)), ENV_LIST_URI);
    }

    #[test]
    fn test_custom_keywords() {
        let mut env = base_env();
        env.insert(ENV_KEYWORDS.to_string(), "sale, 40% off,clearance".to_string());

        let config = load(&env).unwrap();
        assert_eq!(config.keywords, vec!["sale", "40% off", "clearance"]);
    }

    #[test]
    fn test_env_policy_overrides() {
        let mut env = base_env();
        env.insert(ENV_HIGH_WATER_MARK.to_string(), "50".to_string());
        env.insert(ENV_EVICT_BATCH.to_string(), "10".to_string());
        env.insert(ENV_POSTS_PER_ACCOUNT.to_string(), "5".to_string());
        env.insert(ENV_ACCOUNT_DELAY.to_string(), "250ms".to_string());

        let policy = load(&env).unwrap().policy;
        assert_eq!(policy.high_water_mark, 50);
        assert_eq!(policy.evict_batch_size, 10);
        assert_eq!(policy.posts_per_account, 5);
        assert_eq!(policy.list_page_limit, 100);
        assert_eq!(policy.account_delay, Duration::from_millis(250));
    }

    fn invalid_setting(result: Result<Config>) -> String {
        match result {
            Err(PressbotError::Config(ConfigError::InvalidValue(name, _))) => name,
            other => panic!("Expected invalid value error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_policy_values_name_the_variable() {
        let cases = [
            (ENV_EVICT_BATCH, "lots"),
            (ENV_EVICT_BATCH, "0"),
            (ENV_HIGH_WATER_MARK, "0"),
            (ENV_POSTS_PER_ACCOUNT, "101"),
            (ENV_LIST_PAGE_LIMIT, "0"),
            (ENV_ACCOUNT_DELAY, "soon"),
        ];

        for (name, value) in cases {
            let mut env = base_env();
            env.insert(name.to_string(), value.to_string());
            assert_eq!(invalid_setting(load(&env)), name, "value {:?}", value);
        }
    }

    #[test]
    fn test_invalid_policy_error_message_names_variable() {
        let mut env = base_env();
        env.insert(ENV_EVICT_BATCH.to_string(), "0".to_string());

        let message = load(&env).unwrap_err().to_string();
        assert_eq!(
            message,
            "Configuration error: Invalid value for PRESSBOT_EVICT_BATCH: must be greater than zero"
        );
    }

    #[test]
    fn test_invalid_policy_file_value_names_the_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pressbot.toml");
        std::fs::write(&path, "[policy]\nlist_page_limit = 500\n").unwrap();

        let mut env = base_env();
        env.insert(ENV_CONFIG.to_string(), path.to_string_lossy().to_string());
        assert_eq!(invalid_setting(load(&env)), "policy.list_page_limit");
    }

    #[test]
    fn test_invalid_file_value_rejected_even_when_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pressbot.toml");
        std::fs::write(&path, "[policy]\nevict_batch_size = 0\n").unwrap();

        let mut env = base_env();
        env.insert(ENV_CONFIG.to_string(), path.to_string_lossy().to_string());
        env.insert(ENV_EVICT_BATCH.to_string(), "10".to_string());
        assert_eq!(invalid_setting(load(&env)), "policy.evict_batch_size");
    }

    #[test]
    fn test_policy_file_then_env_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pressbot.toml");
        std::fs::write(
            &path,
            r#"
[policy]
high_water_mark = 200
evict_batch_size = 100
account_delay = "2s"
"#,
        )
        .unwrap();

        let mut env = base_env();
        env.insert(ENV_CONFIG.to_string(), path.to_string_lossy().to_string());
        env.insert(ENV_EVICT_BATCH.to_string(), "150".to_string());

        let policy = load(&env).unwrap().policy;
        assert_eq!(policy.high_water_mark, 200);
        assert_eq!(policy.evict_batch_size, 150);
        assert_eq!(policy.account_delay, Duration::from_secs(2));
        assert_eq!(policy.posts_per_account, 20);
    }

    #[test]
    fn test_policy_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let mut env = base_env();
        env.insert(
            ENV_CONFIG.to_string(),
            temp_dir.path().join("missing.toml").to_string_lossy().to_string(),
        );
        assert!(matches!(
            load(&env),
            Err(PressbotError::Config(ConfigError::ReadError(_)))
        ));

        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[policy]\nhigh_water_mark = \"many\"\n").unwrap();
        env.insert(ENV_CONFIG.to_string(), path.to_string_lossy().to_string());
        assert!(matches!(
            load(&env),
            Err(PressbotError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_state_file_tilde_expansion() {
        let mut env = base_env();
        env.insert(ENV_STATE_FILE.to_string(), "~/pressbot/seen.json".to_string());

        let config = load(&env).unwrap();
        assert!(!config.state_file.to_string_lossy().starts_with('~'));
        assert!(config.state_file.ends_with("pressbot/seen.json"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_USERNAME, "env.bsky.social");
        std::env::set_var(ENV_PASSWORD, "env-password");
        std::env::set_var(ENV_LIST_URI, "at://did:plc:owner/app.bsky.graph.list/env");
        std::env::set_var(ENV_KEYWORDS, "markdown");

        let config = Config::from_env();

        std::env::remove_var(ENV_USERNAME);
        std::env::remove_var(ENV_PASSWORD);
        std::env::remove_var(ENV_LIST_URI);
        std::env::remove_var(ENV_KEYWORDS);

        let config = config.unwrap();
        assert_eq!(config.bluesky.username, "env.bsky.social");
        assert_eq!(config.keywords, vec!["markdown"]);
    }
}
