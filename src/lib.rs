pub mod browser;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fixture;
pub mod poll;
pub mod verify;

//  Re-export commonly used items
pub use browser::{
    AssistantChat, ChatLocators, ChromeDriver, ConnectionMode, ElementState, Locator,
    LocatorSnapshot, PageActions, PageState,
};
pub use config::SuiteConfig;
pub use diagnostics::{capture_failure, FailureRecord};
pub use error::BrowserError;
pub use fixture::{CreatedEntity, FailurePolicy, FixtureContext, StepVerdict};
pub use poll::{
    poll_until, wait_for_absence, wait_for_appearance, wait_for_async_reply, wait_for_element,
    wait_for_enabled, wait_for_text, PaginatedSearch, PollOptions, PollOutcome, Recovery,
    ReplyFeed, ReplySnapshot, SearchResult, Tick, WaitReport,
};
pub use verify::ApiVerifier;
