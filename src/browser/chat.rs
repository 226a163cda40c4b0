//! Assistant chat panel
//!
//! Page object for the conversational assistant that performs administrative
//! actions (create users, branches, macros, navigate) from natural-language
//! commands.

use super::locator::Locator;
use super::page::{PageActions, PageState};
use crate::error::{BrowserError, Result};
use crate::poll::{
    wait_for_async_reply, wait_for_element, wait_for_enabled, PollOptions, PollOutcome, Recovery,
    ReplyFeed, ReplySnapshot,
};
use async_trait::async_trait;

/// Element IDs of the chat panel
#[derive(Debug, Clone)]
pub struct ChatLocators {
    pub toggle: Locator,
    pub panel: Locator,
    pub input: Locator,
    pub send: Locator,
    pub replies: Locator,
    pub typing: Locator,
}

impl Default for ChatLocators {
    fn default() -> Self {
        Self {
            toggle: Locator::id("chat-toggle"),
            panel: Locator::id("chat-panel"),
            input: Locator::id("chat-input"),
            send: Locator::id("chat-send"),
            replies: Locator::css(".chat-message.assistant"),
            typing: Locator::css(".typing-indicator"),
        }
    }
}

pub struct AssistantChat<'p, P: ?Sized> {
    page: &'p P,
    locators: ChatLocators,
}

impl<'p, P> AssistantChat<'p, P>
where
    P: PageState + PageActions + ?Sized,
{
    pub fn new(page: &'p P) -> Self {
        Self::with_locators(page, ChatLocators::default())
    }

    pub fn with_locators(page: &'p P, locators: ChatLocators) -> Self {
        Self { page, locators }
    }

    pub fn locators(&self) -> &ChatLocators {
        &self.locators
    }

    pub async fn is_open(&self) -> Result<bool> {
        Ok(self.page.element_state(&self.locators.panel).await?.visible)
    }

    /// Open the panel if it is closed and wait for it to render
    pub async fn open(&self) -> Result<()> {
        if self.is_open().await? {
            return Ok(());
        }

        log::info!("💬 Opening assistant panel");
        self.page.click(&self.locators.toggle).await?;
        let options = PollOptions::dom_update(format!("assistant panel {}", self.locators.panel));
        wait_for_element(self.page, &self.locators.panel, &options)
            .await?
            .into_result()?;
        Ok(())
    }

    pub async fn reply_count(&self) -> Result<usize> {
        self.page.count(&self.locators.replies).await
    }

    /// Type a message and press send, without waiting for an answer
    pub async fn send(&self, message: &str) -> Result<()> {
        if message.trim().is_empty() {
            return Err(BrowserError::Other("Refusing to send a blank message".to_string()));
        }
        self.page.fill(&self.locators.input, message).await?;
        self.page.click(&self.locators.send).await
    }

    /// Reload the page and bring the panel back
    pub fn reopen_recovery(&self) -> Recovery<'_> {
        Recovery::new("reload and reopen assistant panel", move || async move {
            self.page.reload().await?;
            self.open().await
        })
    }

    /// Send `message` and wait for the assistant's complete reply.
    ///
    /// The input can stay disabled while the previous answer is processed or
    /// while no LLM provider is configured; that wait reloads and reopens the
    /// panel between attempts.
    pub async fn ask(&self, message: &str, options: &PollOptions) -> Result<PollOutcome<String>> {
        self.open().await?;

        let input_options = PollOptions::save(format!("{} to accept input", self.locators.input));
        let ready = wait_for_enabled(
            self.page,
            &self.locators.input,
            Some(self.reopen_recovery()),
            &input_options,
        )
        .await?;

        match ready {
            PollOutcome::Succeeded(()) => {}
            PollOutcome::TimedOut(report) => return Ok(PollOutcome::TimedOut(report)),
            PollOutcome::RecoveryExhausted(report) => {
                return Ok(PollOutcome::RecoveryExhausted(report))
            }
        }

        // Counted after any reload, which may have re-rendered the history
        let baseline = self.reply_count().await?;
        log::info!("💬 Asking assistant ({} replies so far): {}", baseline, message);
        self.send(message).await?;
        wait_for_async_reply(self, baseline, options).await
    }
}

#[async_trait]
impl<'p, P> ReplyFeed for AssistantChat<'p, P>
where
    P: PageState + PageActions + ?Sized,
{
    async fn snapshot(&self) -> Result<ReplySnapshot> {
        let locators = [self.locators.replies.clone(), self.locators.typing.clone()];
        let mut snaps = self.page.snapshot(&locators).await?.into_iter();

        let (replies, typing) = match (snaps.next(), snaps.next()) {
            (Some(r), Some(t)) => (r, t),
            _ => {
                return Err(BrowserError::ScriptFailed(
                    "Chat snapshot returned fewer entries than requested".to_string(),
                ))
            }
        };

        Ok(ReplySnapshot {
            count: replies.count,
            typing_visible: typing.count > 0 && typing.visible,
            newest_text: replies.last_text,
        })
    }
}
