//! Client configuration.
//!
//! Values come from code or from the environment:
//! - `NOTFLIX_API_URL`: base URL of the backend.
//! - `NOTFLIX_WATCHLIST_PATHS`: `separated` (default) or `legacy`.

use std::env;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://notflixapi.herokuapp.com/";
pub const BASE_URL_ENV: &str = "NOTFLIX_API_URL";
pub const WATCHLIST_PATHS_ENV: &str = "NOTFLIX_WATCHLIST_PATHS";

/// How watchlist add/remove paths are formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchlistPaths {
    /// `users/:username/watchlist/:movie_id`
    #[default]
    Separated,
    /// `users/:usernamewatchlist/:movie_id`, as deployed web clients sent it.
    /// Only for backends that route that malformed path.
    Legacy,
}

impl WatchlistPaths {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "separated" => Some(WatchlistPaths::Separated),
            "legacy" => Some(WatchlistPaths::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub watchlist_paths: WatchlistPaths,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            watchlist_paths: WatchlistPaths::default(),
        }
    }

    pub fn with_watchlist_paths(mut self, paths: WatchlistPaths) -> Self {
        self.watchlist_paths = paths;
        self
    }

    /// Build from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty());
        let mut config = Self::new(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        if let Some(raw) = lookup(WATCHLIST_PATHS_ENV) {
            match WatchlistPaths::parse(&raw) {
                Some(paths) => config.watchlist_paths = paths,
                None => warn!(value = %raw, "ignoring unknown {WATCHLIST_PATHS_ENV}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.base_url, "https://notflixapi.herokuapp.com");
        assert_eq!(config.watchlist_paths, WatchlistPaths::Separated);
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://localhost:3000/"),
            (WATCHLIST_PATHS_ENV, "Legacy"),
        ]));
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.watchlist_paths, WatchlistPaths::Legacy);
    }

    #[test]
    fn unknown_watchlist_style_keeps_default() {
        let config = ClientConfig::from_lookup(lookup(&[(WATCHLIST_PATHS_ENV, "sometimes")]));
        assert_eq!(config.watchlist_paths, WatchlistPaths::Separated);
    }

    #[test]
    fn blank_base_url_falls_back() {
        let config = ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "  ")]));
        assert_eq!(config.base_url, "https://notflixapi.herokuapp.com");
    }
}
