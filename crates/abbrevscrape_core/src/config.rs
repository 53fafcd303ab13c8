use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fetch::{HttpSourceConfig, ListingRequest};
use crate::listing::{DEFAULT_CONTAINER_ID, DEFAULT_NEXT_LABEL, ListingMarkers};

pub const DEFAULT_START_URL: &str =
    "https://en.wiktionary.org/w/index.php?title=Category:English_abbreviations&from=A";
pub const DEFAULT_SITE_ROOT: &str = "https://en.wiktionary.org";
pub const DEFAULT_MAX_PAGES: i64 = 21;
pub const DEFAULT_DELAY_SECONDS: f64 = 1.0;
pub const DEFAULT_USER_AGENT: &str = "abbrevscrape/0.2";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_CONFIG_TOML: &str = r#"# abbrevscrape settings. Environment variables (ABBREVSCRAPE_*) take precedence.
[scrape]
start_url = "https://en.wiktionary.org/w/index.php?title=Category:English_abbreviations&from=A"
site_root = "https://en.wiktionary.org"
max_pages = 21
# Seconds to wait between page fetches; must be at least 1.
delay_seconds = 1.0
user_agent = "abbrevscrape/0.2"
timeout_ms = 30000
container_id = "mw-pages"
next_label = "next page"
"#;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub scrape: ScrapeSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ScrapeSection {
    pub start_url: Option<String>,
    pub site_root: Option<String>,
    pub max_pages: Option<i64>,
    pub delay_seconds: Option<f64>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
    pub container_id: Option<String>,
    pub next_label: Option<String>,
}

/// Per-invocation overrides, typically from CLI flags. They beat env and file values.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub start_url: Option<String>,
    pub site_root: Option<String>,
    pub max_pages: Option<i64>,
    pub delay_seconds: Option<f64>,
}

impl ScrapeConfig {
    /// HTTP client settings: env ABBREVSCRAPE_USER_AGENT / ABBREVSCRAPE_HTTP_TIMEOUT_MS > config > default.
    pub fn http_source(&self) -> Result<HttpSourceConfig> {
        self.http_source_with_lookup(&env_string)
    }

    fn http_source_with_lookup<F>(&self, lookup_env: &F) -> Result<HttpSourceConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user_agent = lookup_env("ABBREVSCRAPE_USER_AGENT")
            .or_else(|| self.scrape.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let timeout_ms = match lookup_env("ABBREVSCRAPE_HTTP_TIMEOUT_MS") {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| format!("invalid ABBREVSCRAPE_HTTP_TIMEOUT_MS: {value}"))?,
            None => self.scrape.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        };
        Ok(HttpSourceConfig {
            user_agent,
            timeout_ms,
        })
    }

    pub fn markers(&self) -> ListingMarkers {
        ListingMarkers {
            container_id: self
                .scrape
                .container_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTAINER_ID.to_string()),
            next_label: self
                .scrape
                .next_label
                .clone()
                .unwrap_or_else(|| DEFAULT_NEXT_LABEL.to_string()),
        }
    }

    /// Build the fetch request, letting `overrides` win over env and file values.
    ///
    /// No range checks happen here; `fetch_listing` owns parameter validation.
    pub fn listing_request(&self, overrides: &RequestOverrides) -> Result<ListingRequest> {
        self.listing_request_with_lookup(overrides, &env_string)
    }

    fn listing_request_with_lookup<F>(
        &self,
        overrides: &RequestOverrides,
        lookup_env: &F,
    ) -> Result<ListingRequest>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_pages = match overrides.max_pages {
            Some(value) => value,
            None => self.max_pages_with(lookup_env)?,
        };
        let delay_seconds = match overrides.delay_seconds {
            Some(value) => value,
            None => self.delay_seconds_with(lookup_env)?,
        };
        Ok(ListingRequest {
            start_url: overrides
                .start_url
                .clone()
                .unwrap_or_else(|| self.start_url_with(lookup_env)),
            site_root: overrides
                .site_root
                .clone()
                .unwrap_or_else(|| self.site_root_with(lookup_env)),
            max_pages,
            delay_seconds,
            markers: self.markers(),
        })
    }

    fn start_url_with<F: Fn(&str) -> Option<String>>(&self, lookup_env: &F) -> String {
        lookup_env("ABBREVSCRAPE_START_URL")
            .or_else(|| self.scrape.start_url.clone())
            .unwrap_or_else(|| DEFAULT_START_URL.to_string())
    }

    fn site_root_with<F: Fn(&str) -> Option<String>>(&self, lookup_env: &F) -> String {
        lookup_env("ABBREVSCRAPE_SITE_ROOT")
            .or_else(|| self.scrape.site_root.clone())
            .unwrap_or_else(|| DEFAULT_SITE_ROOT.to_string())
    }

    fn max_pages_with<F: Fn(&str) -> Option<String>>(&self, lookup_env: &F) -> Result<i64> {
        match lookup_env("ABBREVSCRAPE_MAX_PAGES") {
            Some(value) => value
                .parse::<i64>()
                .with_context(|| format!("invalid ABBREVSCRAPE_MAX_PAGES: {value}")),
            None => Ok(self.scrape.max_pages.unwrap_or(DEFAULT_MAX_PAGES)),
        }
    }

    fn delay_seconds_with<F: Fn(&str) -> Option<String>>(&self, lookup_env: &F) -> Result<f64> {
        match lookup_env("ABBREVSCRAPE_DELAY_SECONDS") {
            Some(value) => value
                .parse::<f64>()
                .with_context(|| format!("invalid ABBREVSCRAPE_DELAY_SECONDS: {value}")),
            None => Ok(self.scrape.delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS)),
        }
    }
}

/// Load and parse a ScrapeConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ScrapeConfig> {
    if !config_path.exists() {
        return Ok(ScrapeConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ScrapeConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Write [`DEFAULT_CONFIG_TOML`] unless a config exists and `force` is false.
/// Returns `true` when a write occurred.
pub fn write_default_config(config_path: &Path, force: bool) -> Result<bool> {
    if config_path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(config_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(true)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_points_at_wiktionary() {
        let config = ScrapeConfig::default();
        assert!(config.scrape.start_url.is_none());
        assert_eq!(config.markers(), ListingMarkers::default());
        assert!(DEFAULT_START_URL.starts_with(DEFAULT_SITE_ROOT));
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/abbrevscrape.toml")).expect("load config");
        assert_eq!(config, ScrapeConfig::default());
    }

    #[test]
    fn load_config_parses_scrape_section() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("abbrevscrape.toml");
        fs::write(
            &config_path,
            r#"
[scrape]
start_url = "https://dict.example/list?from=A"
site_root = "https://dict.example"
max_pages = 3
delay_seconds = 2.5
container_id = "entries"
next_label = "More"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.scrape.start_url.as_deref(),
            Some("https://dict.example/list?from=A")
        );
        assert_eq!(config.scrape.max_pages, Some(3));
        assert_eq!(config.scrape.delay_seconds, Some(2.5));
        assert_eq!(config.markers().container_id, "entries");
        assert_eq!(config.markers().next_label, "More");
    }

    #[test]
    fn load_config_tolerates_other_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("abbrevscrape.toml");
        fs::write(&config_path, "[other]\nkey = \"value\"\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.scrape.max_pages.is_none());
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("abbrevscrape.toml");
        fs::write(&config_path, "[scrape\nmax_pages = 2").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn default_config_template_parses() {
        let parsed: ScrapeConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("parse template");
        assert_eq!(parsed.scrape.start_url.as_deref(), Some(DEFAULT_START_URL));
        assert_eq!(parsed.scrape.site_root.as_deref(), Some(DEFAULT_SITE_ROOT));
        assert_eq!(parsed.scrape.max_pages, Some(DEFAULT_MAX_PAGES));
        assert_eq!(parsed.scrape.delay_seconds, Some(DEFAULT_DELAY_SECONDS));
        assert_eq!(parsed.scrape.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn write_default_config_respects_force() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("abbrevscrape.toml");
        assert!(write_default_config(&config_path, false).expect("first write"));
        fs::write(&config_path, "[scrape]\nmax_pages = 5\n").expect("edit config");
        assert!(!write_default_config(&config_path, false).expect("second write"));
        assert_eq!(
            load_config(&config_path).expect("load").scrape.max_pages,
            Some(5)
        );
        assert!(write_default_config(&config_path, true).expect("forced write"));
        assert_eq!(
            load_config(&config_path).expect("load").scrape.max_pages,
            Some(DEFAULT_MAX_PAGES)
        );
    }

    #[test]
    fn overrides_beat_file_values() {
        let config = ScrapeConfig {
            scrape: ScrapeSection {
                start_url: Some("https://file.example/start".to_string()),
                max_pages: Some(4),
                delay_seconds: Some(3.0),
                ..ScrapeSection::default()
            },
        };
        let request = config
            .listing_request_with_lookup(
                &RequestOverrides {
                    max_pages: Some(2),
                    site_root: Some("https://flag.example".to_string()),
                    ..RequestOverrides::default()
                },
                &|_: &str| None,
            )
            .expect("request");
        assert_eq!(request.max_pages, 2);
        assert_eq!(request.site_root, "https://flag.example");
        assert_eq!(request.delay_seconds, 3.0);
    }

    #[test]
    fn env_beats_file_but_not_flags() {
        let config = ScrapeConfig {
            scrape: ScrapeSection {
                start_url: Some("https://file.example/start".to_string()),
                site_root: Some("https://file.example".to_string()),
                max_pages: Some(4),
                delay_seconds: Some(3.0),
                ..ScrapeSection::default()
            },
        };
        let env = HashMap::from([
            ("ABBREVSCRAPE_START_URL", "https://env.example/start"),
            ("ABBREVSCRAPE_MAX_PAGES", "7"),
            ("ABBREVSCRAPE_DELAY_SECONDS", "1.5"),
        ]);
        let lookup = |key: &str| env.get(key).map(|value| value.to_string());

        let request = config
            .listing_request_with_lookup(
                &RequestOverrides {
                    delay_seconds: Some(2.0),
                    ..RequestOverrides::default()
                },
                &lookup,
            )
            .expect("request");
        assert_eq!(request.start_url, "https://env.example/start");
        assert_eq!(request.site_root, "https://file.example");
        assert_eq!(request.max_pages, 7);
        assert_eq!(request.delay_seconds, 2.0);
    }

    #[test]
    fn unparseable_env_number_is_reported() {
        let config = ScrapeConfig::default();
        let lookup = |key: &str| (key == "ABBREVSCRAPE_MAX_PAGES").then(|| "many".to_string());
        let error = config
            .listing_request_with_lookup(&RequestOverrides::default(), &lookup)
            .expect_err("must fail");
        assert!(error.to_string().contains("ABBREVSCRAPE_MAX_PAGES"));
    }

    #[test]
    fn http_settings_resolve_env_then_file() {
        let config = ScrapeConfig {
            scrape: ScrapeSection {
                user_agent: Some("file-agent/1".to_string()),
                timeout_ms: Some(5_000),
                ..ScrapeSection::default()
            },
        };
        let http = config
            .http_source_with_lookup(&|_: &str| None)
            .expect("http settings");
        assert_eq!(http.user_agent, "file-agent/1");
        assert_eq!(http.timeout_ms, 5_000);

        let lookup =
            |key: &str| (key == "ABBREVSCRAPE_HTTP_TIMEOUT_MS").then(|| "750".to_string());
        let http = config.http_source_with_lookup(&lookup).expect("http settings");
        assert_eq!(http.timeout_ms, 750);
    }

    #[test]
    fn unparseable_env_timeout_is_reported() {
        let config = ScrapeConfig::default();
        let lookup =
            |key: &str| (key == "ABBREVSCRAPE_HTTP_TIMEOUT_MS").then(|| "soon".to_string());
        let error = config
            .http_source_with_lookup(&lookup)
            .expect_err("must fail");
        assert!(error.to_string().contains("ABBREVSCRAPE_HTTP_TIMEOUT_MS"));
    }
}
