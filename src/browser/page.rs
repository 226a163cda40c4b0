//! Page capabilities used by the poller
//!
//! `PageState` reads the page as it is right now; `PageActions` fires a
//! single interaction whose effect is only visible to a later read. Neither
//! waits implicitly: all waiting goes through `crate::poll`.

use super::locator::Locator;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Presence and interactivity of the first element matched by a locator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub present: bool,
    pub visible: bool,
    pub enabled: bool,
}

/// Count, visibility and newest text of one locator, read in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSnapshot {
    pub count: usize,
    pub visible: bool,
    pub last_text: Option<String>,
}

#[async_trait]
pub trait PageState: Send + Sync {
    async fn element_state(&self, locator: &Locator) -> Result<ElementState>;

    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Visible text of every match, in document order
    async fn texts(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Current `value` of the first matched input/select/textarea
    async fn value(&self, locator: &Locator) -> Result<Option<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>>;

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self.texts(locator).await?.into_iter().next())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        Ok(self.count(locator).await? > 0)
    }

    /// Read several locators at once.
    ///
    /// The default reads them one after another; implementations backed by a
    /// live page should override this with a single evaluation so that every
    /// snapshot reflects the same DOM state.
    async fn snapshot(&self, locators: &[Locator]) -> Result<Vec<LocatorSnapshot>> {
        let mut out = Vec::with_capacity(locators.len());
        for locator in locators {
            let texts = self.texts(locator).await?;
            let state = self.element_state(locator).await?;
            out.push(LocatorSnapshot {
                count: texts.len(),
                visible: state.visible,
                last_text: texts.into_iter().last(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
pub trait PageActions: Send + Sync {
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Replace the value of an input or textarea
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Choose an option of a `<select>` by value
    async fn select(&self, locator: &Locator, value: &str) -> Result<()>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn reload(&self) -> Result<()>;
}
