//! Waiting for things to show up (or go away) on the page

use super::poller::{poll_until, PollOptions, PollOutcome, Recovery, Tick};
use crate::browser::{ElementState, Locator, PageActions, PageState};
use crate::diagnostics::fingerprint;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Poll `lookup` until it returns a non-empty result
pub async fn wait_for_appearance<T, L, Fut>(
    options: &PollOptions,
    mut lookup: L,
) -> Result<PollOutcome<Vec<T>>>
where
    L: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    poll_until(options, None, || {
        let found = lookup();
        async move {
            let found = found.await?;
            Ok(if found.is_empty() {
                Tick::NotYet
            } else {
                Tick::Ready(found)
            })
        }
    })
    .await
}

/// Wait until the first element matched by `locator` is present and visible
pub async fn wait_for_element<P>(
    page: &P,
    locator: &Locator,
    options: &PollOptions,
) -> Result<PollOutcome<ElementState>>
where
    P: PageState + ?Sized,
{
    poll_until(options, None, move || async move {
        let state = page.element_state(locator).await?;
        Ok(if state.present && state.visible {
            Tick::Ready(state)
        } else {
            Tick::NotYet
        })
    })
    .await
}

/// Wait for a match of `locator` whose text contains `text`; yields that text
pub async fn wait_for_text<P>(
    page: &P,
    locator: &Locator,
    text: &str,
    options: &PollOptions,
) -> Result<PollOutcome<String>>
where
    P: PageState + ?Sized,
{
    poll_until(options, None, move || async move {
        let texts = page.texts(locator).await?;
        Ok(Tick::from_option(texts.into_iter().find(|t| t.contains(text))))
    })
    .await
}

/// Wait until nothing matches `locator`, e.g. after deleting a row
pub async fn wait_for_absence<P>(
    page: &P,
    locator: &Locator,
    options: &PollOptions,
) -> Result<PollOutcome<()>>
where
    P: PageState + ?Sized,
{
    poll_until(options, None, move || async move {
        Ok(Tick::when(page.count(locator).await? == 0))
    })
    .await
}

/// Recovery that reloads the page
pub fn reload_recovery<P>(page: &P) -> Recovery<'_>
where
    P: PageActions + ?Sized,
{
    Recovery::new("reload page", move || page.reload())
}

/// Wait until a control is present and enabled.
///
/// A control can stay disabled for reasons unrelated to timing (a provider
/// is not configured, a panel lost its state). `recovery`, typically a reload
/// followed by re-opening the panel, runs after every
/// `max_attempts_before_recovery` failed checks.
pub async fn wait_for_enabled<'a, P>(
    page: &'a P,
    locator: &'a Locator,
    recovery: Option<Recovery<'a>>,
    options: &PollOptions,
) -> Result<PollOutcome<()>>
where
    P: PageState + ?Sized,
{
    let outcome = poll_until(options, recovery, move || async move {
        let state = page.element_state(locator).await?;
        Ok(Tick::when(state.present && state.enabled))
    })
    .await?;

    Ok(match outcome {
        PollOutcome::RecoveryExhausted(mut report) => {
            report.description = format!(
                "{} remained disabled after {} refresh attempts",
                locator, report.recoveries
            );
            PollOutcome::RecoveryExhausted(report)
        }
        other => other,
    })
}

/// Wait until the markup of `locator` differs from what it is right now.
///
/// Yields the new markup, or `None` if the element disappeared.
pub async fn wait_for_change<P>(
    page: &P,
    locator: &Locator,
    options: &PollOptions,
) -> Result<PollOutcome<Option<String>>>
where
    P: PageState + ?Sized,
{
    let baseline = page.outer_html(locator).await?.as_deref().map(fingerprint);
    let baseline = &baseline;

    poll_until(options, None, move || async move {
        let html = page.outer_html(locator).await?;
        let current = html.as_deref().map(fingerprint);
        Ok(if current != *baseline {
            Tick::Ready(html)
        } else {
            Tick::NotYet
        })
    })
    .await
}

/// A paged list that can be searched one page at a time
#[async_trait]
pub trait Paginated: Send + Sync {
    type Item: Send;

    /// Look for `needle` on the currently rendered page only
    async fn find_on_page(&self, needle: &str) -> Result<Option<Self::Item>>;

    /// Advance to the next page; `false` when there is none
    async fn next_page(&self) -> Result<bool>;

    /// Go back to the first page before searching again. Sources that cannot
    /// rewind keep searching from wherever they are.
    async fn first_page(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult<T> {
    Found { item: T, page: usize },
    NotFound { pages_searched: usize },
}

impl<T> SearchResult<T> {
    pub fn found(self) -> Option<T> {
        match self {
            SearchResult::Found { item, .. } => Some(item),
            SearchResult::NotFound { .. } => None,
        }
    }
}

/// Page-bounded search. Terminates after `max_pages` pages regardless of time.
#[derive(Debug, Clone, Copy)]
pub struct PaginatedSearch {
    pub max_pages: usize,
}

impl Default for PaginatedSearch {
    fn default() -> Self {
        Self { max_pages: 10 }
    }
}

impl PaginatedSearch {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    pub async fn search<S>(&self, source: &S, needle: &str) -> Result<SearchResult<S::Item>>
    where
        S: Paginated + ?Sized,
    {
        let max_pages = self.max_pages.max(1);

        for page in 1..=max_pages {
            if let Some(item) = source.find_on_page(needle).await? {
                log::debug!("found '{}' on page {}", needle, page);
                return Ok(SearchResult::Found { item, page });
            }
            if page == max_pages {
                break;
            }
            if !source.next_page().await? {
                return Ok(SearchResult::NotFound {
                    pages_searched: page,
                });
            }
        }

        log::info!("'{}' not found in {} pages", needle, max_pages);
        Ok(SearchResult::NotFound {
            pages_searched: max_pages,
        })
    }
}

/// Wait until `needle` shows up somewhere in a paged list.
///
/// Every tick is one complete `search` (at most `search.max_pages` pages);
/// later ticks rewind with `Paginated::first_page` first. The page bound
/// limits a single tick, `options.timeout` limits the whole wait.
pub async fn wait_for_appearance_paged<S>(
    source: &S,
    needle: &str,
    search: PaginatedSearch,
    options: &PollOptions,
) -> Result<PollOutcome<S::Item>>
where
    S: Paginated + ?Sized,
{
    let mut first = true;
    poll_until(options, None, move || {
        let rewind = !std::mem::replace(&mut first, false);
        async move {
            if rewind {
                source.first_page().await?;
            }
            Ok(match search.search(source, needle).await? {
                SearchResult::Found { item, .. } => Tick::Ready(item),
                SearchResult::NotFound { .. } => Tick::NotYet,
            })
        }
    })
    .await
}

/// A rendered table with a "next page" control
pub struct TablePager<'p, P: ?Sized> {
    page: &'p P,
    rows: Locator,
    next: Locator,
    turn_timeout: Duration,
}

impl<'p, P: ?Sized> TablePager<'p, P> {
    pub fn new(page: &'p P, rows: Locator, next: Locator) -> Self {
        Self {
            page,
            rows,
            next,
            turn_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }
}

#[async_trait]
impl<'p, P> Paginated for TablePager<'p, P>
where
    P: PageState + PageActions + ?Sized,
{
    type Item = String;

    async fn find_on_page(&self, needle: &str) -> Result<Option<String>> {
        let texts = self.page.texts(&self.rows).await?;
        Ok(texts.into_iter().find(|t| t.contains(needle)))
    }

    async fn next_page(&self) -> Result<bool> {
        let state = self.page.element_state(&self.next).await?;
        if !state.present || !state.enabled {
            return Ok(false);
        }

        let before = self.page.texts(&self.rows).await?;
        self.page.click(&self.next).await?;

        let options = PollOptions::dom_update(format!("{} to show the next page", self.rows))
            .with_timeout(self.turn_timeout);
        let (page, rows, before) = (self.page, &self.rows, &before);
        let turned = poll_until(&options, None, move || async move {
            Ok(Tick::when(page.texts(rows).await? != *before))
        })
        .await?;

        if let Some(report) = turned.report() {
            log::warn!("next page did not render: {}", report);
            return Ok(false);
        }
        Ok(true)
    }
}
