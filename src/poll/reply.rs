//! Waiting for an assistant reply
//!
//! A reply only counts when, on one and the same snapshot, the number of reply
//! items grew past the baseline, no typing indicator is visible, and the newest
//! item has non-blank text. A bubble that appears while the indicator is still
//! shown is a placeholder whose content has not streamed in yet.

use super::poller::{poll_until, PollOptions, PollOutcome, Recovery, Tick};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// State of a reply list, read atomically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    pub count: usize,
    pub typing_visible: bool,
    pub newest_text: Option<String>,
}

impl ReplySnapshot {
    /// The newest reply text if a complete reply arrived after `baseline` items
    pub fn reply_after(&self, baseline: usize) -> Option<String> {
        if self.count <= baseline || self.typing_visible {
            return None;
        }
        self.newest_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
pub trait ReplyFeed: Send + Sync {
    async fn snapshot(&self) -> Result<ReplySnapshot>;
}

pub async fn wait_for_async_reply<F>(
    feed: &F,
    baseline: usize,
    options: &PollOptions,
) -> Result<PollOutcome<String>>
where
    F: ReplyFeed + ?Sized,
{
    wait_for_async_reply_with_recovery(feed, baseline, None, options).await
}

/// Like `wait_for_async_reply`, with a recovery action for a stuck panel.
///
/// The baseline is kept across recoveries; a reload that re-renders the whole
/// history still has to produce one more item than before.
pub async fn wait_for_async_reply_with_recovery<F>(
    feed: &F,
    baseline: usize,
    recovery: Option<Recovery<'_>>,
    options: &PollOptions,
) -> Result<PollOutcome<String>>
where
    F: ReplyFeed + ?Sized,
{
    log::debug!(
        "waiting for reply #{} ({})",
        baseline + 1,
        options.description
    );
    poll_until(options, recovery, move || async move {
        let snapshot = feed.snapshot().await?;
        if snapshot.count > baseline && snapshot.typing_visible {
            log::debug!("reply bubble present but typing indicator still shown");
        }
        Ok(Tick::from_option(snapshot.reply_after(baseline)))
    })
    .await
}
