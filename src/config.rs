//! Suite configuration
//!
//! Read from `E2E_*` environment variables. CI runners are detected the same
//! way everywhere: they run headless and without the Chrome sandbox unless
//! told otherwise.

use crate::poll::PollOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Root URL of the application under test
    pub base_url: String,
    pub headless: bool,
    pub no_sandbox: bool,
    pub chrome_path: Option<String>,
    /// Connect to an already running Chrome instead of launching one
    pub debug_port: Option<u16>,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    /// Where failure screenshots and HTML go
    pub artifact_dir: PathBuf,
    /// Backend API root for out-of-band verification
    pub api_url: Option<String>,
    pub api_token: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4200".to_string(),
            headless: false,
            no_sandbox: false,
            chrome_path: None,
            debug_port: None,
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(30),
            artifact_dir: PathBuf::from("./e2e-artifacts"),
            api_url: None,
            api_token: None,
        }
    }
}

impl SuiteConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let ci = ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_HOME", "CIRCLECI"]
            .iter()
            .any(|k| lookup(k).is_some());

        let flag = |key: &str, fallback: bool| match lookup(key) {
            Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            None => fallback,
        };
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            base_url: lookup("E2E_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            headless: flag("E2E_HEADLESS", ci),
            no_sandbox: flag("E2E_NO_SANDBOX", ci),
            chrome_path: lookup("E2E_CHROME_PATH"),
            debug_port: lookup("E2E_DEBUG_PORT").and_then(|p| p.trim().parse().ok()),
            poll_interval: millis("E2E_POLL_INTERVAL_MS", defaults.poll_interval),
            poll_timeout: millis("E2E_POLL_TIMEOUT_MS", defaults.poll_timeout),
            artifact_dir: lookup("E2E_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            api_url: lookup("E2E_API_URL"),
            api_token: lookup("E2E_API_TOKEN"),
        }
    }

    /// Absolute URL for an application route such as `/settings/countries`
    pub fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    /// Poll options carrying this suite's interval and timeout
    pub fn poll_options(&self, description: impl Into<String>) -> PollOptions {
        PollOptions::new(description)
            .with_interval(self.poll_interval)
            .with_timeout(self.poll_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> SuiteConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SuiteConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        assert_eq!(config(&[]), SuiteConfig::default());
    }

    #[test]
    fn test_ci_implies_headless_and_no_sandbox() {
        let cfg = config(&[("GITHUB_ACTIONS", "true")]);
        assert!(cfg.headless);
        assert!(cfg.no_sandbox);

        let cfg = config(&[("CI", "1"), ("E2E_HEADLESS", "false")]);
        assert!(!cfg.headless);
        assert!(cfg.no_sandbox);
    }

    #[test]
    fn test_values_are_parsed() {
        let cfg = config(&[
            ("E2E_BASE_URL", "https://staging.example.com/"),
            ("E2E_DEBUG_PORT", "9222"),
            ("E2E_POLL_TIMEOUT_MS", "120000"),
            ("E2E_POLL_INTERVAL_MS", "not-a-number"),
        ]);
        assert_eq!(cfg.base_url, "https://staging.example.com");
        assert_eq!(cfg.debug_port, Some(9222));
        assert_eq!(cfg.poll_timeout, Duration::from_secs(120));
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(
            cfg.url("/settings/countries"),
            "https://staging.example.com/settings/countries"
        );
    }

    #[test]
    fn test_poll_options_use_suite_timing() {
        let cfg = config(&[("E2E_POLL_TIMEOUT_MS", "5000")]);
        let opts = cfg.poll_options("row");
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.description, "row");
    }
}
