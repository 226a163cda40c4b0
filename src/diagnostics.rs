//! Failure artifacts
//!
//! When a wait fails, the log line names what was awaited; the artifacts
//! written here show what the page looked like at that moment.

use crate::browser::ChromeDriver;
use crate::error::Result;
use crate::poll::WaitReport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything recorded about one failed wait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// RFC 3339 capture time
    pub timestamp: String,
    pub url: String,
    pub title: String,
    /// What was awaited and for how long
    pub wait: WaitReport,
    pub screenshot_path: Option<String>,
    pub html_path: String,
    /// SHA-256 of the saved HTML
    pub html_hash: String,
}

impl FailureRecord {
    pub fn from_report(report: &WaitReport, url: String, title: String) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            url,
            title,
            wait: report.clone(),
            screenshot_path: None,
            html_path: String::new(),
            html_hash: String::new(),
        }
    }
}

/// SHA-256 of `content` as lowercase hex
pub fn fingerprint(content: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directory name for one failure: timestamp plus a filesystem-safe label
pub fn artifact_dir_name(description: &str) -> String {
    let label: String = description
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let label: String = label.chars().take(48).collect();
    format!("{}_{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"), label)
}

/// Save screenshot, HTML and a `failure.json` record under `root`.
///
/// A screenshot failure is logged and skipped; the HTML and record are still
/// written.
pub async fn capture_failure(
    driver: &ChromeDriver,
    report: &WaitReport,
    root: &Path,
) -> Result<FailureRecord> {
    let dir: PathBuf = root.join(artifact_dir_name(&report.description));
    tokio::fs::create_dir_all(&dir).await?;
    log::info!("📸 Capturing failure artifacts in {}", dir.display());

    let url = driver.current_url().await.unwrap_or_default();
    let title = driver.title().await.unwrap_or_default();
    let mut record = FailureRecord::from_report(report, url, title);

    let screenshot_path = dir.join("page.png");
    match driver.screenshot_to_file(&screenshot_path).await {
        Ok(()) => record.screenshot_path = Some(screenshot_path.to_string_lossy().to_string()),
        Err(e) => log::warn!("Screenshot for failure record failed: {}", e),
    }

    let html = driver.get_page_source().await?;
    let html_path = dir.join("page.html");
    tokio::fs::write(&html_path, &html).await?;
    record.html_path = html_path.to_string_lossy().to_string();
    record.html_hash = fingerprint(&html);

    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| crate::error::BrowserError::Other(format!("Failed to encode record: {}", e)))?;
    tokio::fs::write(dir.join("failure.json"), json).await?;

    Ok(record)
}
