use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::identity::{GoTrueConfig, GoTrueIdentity, IdentityProvider, InMemoryIdentity};
use crate::points::AwardStrategy;

pub const DEFAULT_DB_URL: &str = "sqlite://quest.sqlite3?mode=rwc";

/// Runtime settings read from `QUEST_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestConfig {
    pub db_url: String,
    /// Hosted auth endpoint; `None` runs against the in-memory identity.
    pub auth: Option<GoTrueConfig>,
    pub points_strategy: AwardStrategy,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            auth: None,
            points_strategy: AwardStrategy::default(),
        }
    }
}

impl QuestConfig {
    /// # Errors
    ///
    /// See [`QuestConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PartialAuth` when only one of the auth variables
    /// is set and `ConfigError::InvalidPointsStrategy` for an unknown strategy.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_url = get("QUEST_DB_URL").map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url);

        let auth = match (get("QUEST_AUTH_URL"), get("QUEST_AUTH_ANON_KEY")) {
            (Some(url), Some(key)) => Some(GoTrueConfig::new(url.trim(), key.trim())),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAuth),
        };

        let points_strategy = match get("QUEST_POINTS_STRATEGY") {
            Some(raw) => raw
                .parse::<AwardStrategy>()
                .map_err(ConfigError::InvalidPointsStrategy)?,
            None => AwardStrategy::default(),
        };

        Ok(Self {
            db_url,
            auth,
            points_strategy,
        })
    }

    /// Identity adapter selected by this config.
    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        match &self.auth {
            Some(auth) => Arc::new(GoTrueIdentity::new(auth.clone())),
            None => {
                tracing::warn!("QUEST_AUTH_URL not set; using in-memory identity");
                Arc::new(InMemoryIdentity::new())
            }
        }
    }
}

/// Turn a plain file path into an sqlite URL that creates the file on first use.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite:") {
        return trimmed.to_owned();
    }
    let path = Path::new(trimmed);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}?mode=rwc", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = QuestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QuestConfig::default());
        assert_eq!(config.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn plain_paths_become_sqlite_urls() {
        let config =
            QuestConfig::from_lookup(lookup(&[("QUEST_DB_URL", "/tmp/quest/dev.sqlite3")])).unwrap();
        assert_eq!(config.db_url, "sqlite:///tmp/quest/dev.sqlite3?mode=rwc");

        let relative = normalize_sqlite_url("data/quest.sqlite3".into());
        assert!(relative.starts_with("sqlite://"));
        assert!(relative.ends_with("data/quest.sqlite3?mode=rwc"));

        let memory = "sqlite:file:memdb_cfg?mode=memory&cache=shared";
        assert_eq!(normalize_sqlite_url(memory.into()), memory);
    }

    #[test]
    fn auth_needs_both_variables() {
        let err = QuestConfig::from_lookup(lookup(&[("QUEST_AUTH_URL", "https://auth.test")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::PartialAuth);

        let config = QuestConfig::from_lookup(lookup(&[
            ("QUEST_AUTH_URL", "https://auth.test"),
            ("QUEST_AUTH_ANON_KEY", " anon "),
        ]))
        .unwrap();
        assert_eq!(
            config.auth,
            Some(GoTrueConfig::new("https://auth.test", "anon"))
        );
    }

    #[test]
    fn points_strategy_is_parsed() {
        let config =
            QuestConfig::from_lookup(lookup(&[("QUEST_POINTS_STRATEGY", "rmw")])).unwrap();
        assert_eq!(config.points_strategy, AwardStrategy::ReadModifyWrite);

        let err = QuestConfig::from_lookup(lookup(&[("QUEST_POINTS_STRATEGY", "lazy")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPointsStrategy("lazy".into()));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = QuestConfig::from_lookup(lookup(&[
            ("QUEST_DB_URL", "  "),
            ("QUEST_AUTH_URL", ""),
        ]))
        .unwrap();
        assert_eq!(config, QuestConfig::default());
    }
}
