//! Application-level configuration loading: collection names, listing order and finalize policy.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TENNIS_BACK_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Names of the collections the service reads and writes.
    pub collections: CollectionNames,
    /// Ordering applied to listings.
    pub ordering: OrderingConfig,
    /// Behavior of match finalization.
    pub finalize: FinalizePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Collection names, overridable to share a database with other deployments.
pub struct CollectionNames {
    /// Player roster.
    pub players: String,
    /// Scheduled matches.
    pub future_matches: String,
    /// Archive of finished matches.
    pub played_matches: String,
    /// Collection holding the current match configuration document.
    pub global_state: String,
    /// Id of the configuration document inside [`Self::global_state`].
    pub config_document: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            players: "jugadores".into(),
            future_matches: "partidosFuturos".into(),
            played_matches: "partidosJugados".into(),
            global_state: "estado_global".into(),
            config_document: "config".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Sort keys applied to listings. Disabled sorts return store order.
pub struct OrderingConfig {
    /// Sort scheduled matches by `fecha`, ascending.
    pub future_matches_by_date: bool,
    /// Sort players by `ranking`, ascending.
    pub players_by_ranking: bool,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            future_matches_by_date: true,
            players_by_ranking: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Finalization behavior.
pub struct FinalizePolicy {
    /// Fail finalization when the finished match was not in the scheduled list.
    ///
    /// The current configuration is cleared either way.
    pub strict_future_match_removal: bool,
}

impl AppConfig {
    /// Load the configuration from the resolved path, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration from `path`, falling back to built-in defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        strict_removal = config.finalize.strict_future_match_removal,
                        "loaded application config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("{name}-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = env::temp_dir().join(format!("absent-{}.json", uuid::Uuid::new_v4()));
        let config = AppConfig::load_from(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.collections.global_state, "estado_global");
        assert!(!config.finalize.strict_future_match_removal);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let path = temp_config(
            "partial",
            r#"{"collections": {"players": "roster"}, "finalize": {"strictFutureMatchRemoval": true}}"#,
        );
        let config = AppConfig::load_from(&path);
        fs::remove_file(&path).ok();

        assert_eq!(config.collections.players, "roster");
        assert_eq!(config.collections.future_matches, "partidosFuturos");
        assert!(config.ordering.players_by_ranking);
        assert!(config.finalize.strict_future_match_removal);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_config("malformed", "{ not json");
        let config = AppConfig::load_from(&path);
        fs::remove_file(&path).ok();
        assert_eq!(config, AppConfig::default());
    }
}
